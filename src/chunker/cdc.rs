//! Content-defined chunking with FastCDC.
//!
//! Boundaries come from a rolling gear hash over the content, so an edit
//! only moves the boundaries near it; chunks further away are cut at the
//! same content as before.

use std::io::Read;

use log::{debug, error, trace};

use super::{ChunkCountHint, Chunker};
use crate::block_size::SizeHint;
use crate::buffer::ScanBuffer;
use crate::cdc::FastCdc;
use crate::chunk::Chunk;
use crate::config::ChunkConfig;
use crate::error::ChunkError;
use crate::registry::ChunkerFactory;

/// Splits a stream at content-defined boundaries.
///
/// Every chunk except the last is between `min_size` and `max_size` bytes.
/// Boundaries do not depend on how the reader splits its reads.
///
/// # Example
///
/// ```
/// use splitrs::{ChunkConfig, Chunker, ContentDefinedChunker};
///
/// let data: Vec<u8> = (0..10_000u32).map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8).collect();
/// let config = ChunkConfig::new(256, 1024, 4096)?;
/// let chunker = ContentDefinedChunker::with_config(&data[..], config)?;
///
/// let chunks: Vec<_> = chunker.chunks().collect::<Result<_, _>>()?;
/// let total: usize = chunks.iter().map(|c| c.len()).sum();
/// assert_eq!(total, data.len());
/// # Ok::<(), splitrs::ChunkError>(())
/// ```
#[derive(Debug)]
pub struct ContentDefinedChunker<R> {
    reader: R,
    cdc: FastCdc,
    buffer: ScanBuffer,
    /// Buffered bytes already fed to `cdc`.
    scanned: usize,
    offset: u64,
    at_end: bool,
    config: ChunkConfig,
}

impl<R: Read> ContentDefinedChunker<R> {
    /// Creates the `"fastcdc"` chunker for a stream of the given size.
    ///
    /// Bounds come from [`ChunkConfig::for_size`]: protocol minimum and
    /// maximum, average at the stream's target block size.
    pub fn new(reader: R, size: SizeHint) -> Self {
        let config = ChunkConfig::for_size(size);
        debug!("fastcdc chunker: size={:?}", size);
        Self::build(reader, config)
    }

    /// Creates a chunker with explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] if the bounds are inconsistent
    /// or the average size is not a power of two from 64 B to 16 MiB.
    pub fn with_config(reader: R, config: ChunkConfig) -> Result<Self, ChunkError> {
        config.validate_for_cdc()?;
        Ok(Self::build(reader, config))
    }

    fn build(reader: R, config: ChunkConfig) -> Self {
        debug!(
            "fastcdc bounds: min={} avg={} max={}",
            config.min_size(),
            config.avg_size(),
            config.max_size()
        );

        Self {
            reader,
            cdc: FastCdc::from_valid_config(&config),
            buffer: ScanBuffer::with_capacity(config.max_size()),
            scanned: 0,
            offset: 0,
            at_end: false,
            config,
        }
    }

    /// Returns the chunk bounds in use.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Returns the stream position of the next chunk.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn emit(&mut self, len: usize) -> Chunk {
        let chunk = Chunk::new(self.buffer.split_to(len), self.offset);
        self.offset += len as u64;
        self.scanned = 0;
        trace!("fastcdc chunk: {}", chunk);
        chunk
    }
}

impl<R: Read> Chunker for ContentDefinedChunker<R> {
    fn chunk_count_hint(&self) -> ChunkCountHint {
        ChunkCountHint::UNKNOWN
    }

    fn next_chunk(&mut self) -> Result<Option<Chunk>, ChunkError> {
        loop {
            let unscanned = &self.buffer.as_slice()[self.scanned..];
            match self.cdc.find_boundary(unscanned) {
                Some(len) => {
                    let len = self.scanned + len;
                    return Ok(Some(self.emit(len)));
                }
                None => self.scanned = self.buffer.len(),
            }

            if self.at_end {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                self.cdc.reset();
                let len = self.buffer.len();
                return Ok(Some(self.emit(len)));
            }

            // The hash forces a cut at max_size, so a full buffer always
            // holds a boundary.
            if self.buffer.is_full() {
                error!(
                    "fastcdc chunker found no boundary in {} bytes (max {})",
                    self.buffer.len(),
                    self.buffer.capacity()
                );
                return Err(ChunkError::BufferExhausted {
                    buffered: self.buffer.len(),
                    max: self.buffer.capacity(),
                });
            }
            if self.buffer.fill(&mut self.reader)? == 0 {
                self.at_end = true;
            }
        }
    }
}

/// Factory for the `"fastcdc"` strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastCdcFactory;

impl ChunkerFactory for FastCdcFactory {
    fn new_chunker<'a>(
        &self,
        reader: Box<dyn Read + 'a>,
        size: SizeHint,
        _prior_sizes: &[usize],
    ) -> Box<dyn Chunker + 'a> {
        Box::new(ContentDefinedChunker::new(reader, size))
    }
}
