//! Fixed-span chunking.
//!
//! Every chunk is `chunk_size` bytes except the last, which holds the
//! remainder. The standard strategy derives `chunk_size` from the block
//! size ladder and stabilizes it against the size used last time.

use std::io::Read;

use log::{debug, trace, warn};

use super::{ChunkCountHint, Chunker};
use crate::block_size::{self, SizeHint};
use crate::chunk::Chunk;
use crate::error::ChunkError;
use crate::registry::ChunkerFactory;

/// Splits a stream into chunks of one fixed size.
///
/// # Example
///
/// ```
/// use splitrs::{Chunker, FixedSpanChunker, SizeHint, MIN_BLOCK_SIZE};
///
/// let data = vec![1u8; 300 * 1024];
/// let chunker = FixedSpanChunker::new(&data[..], SizeHint::Known(data.len() as u64), &[]);
/// assert_eq!(chunker.chunk_size(), MIN_BLOCK_SIZE);
///
/// let lens: Vec<usize> = chunker.chunks().map(|c| c.map(|c| c.len())).collect::<Result<_, _>>()?;
/// assert_eq!(lens, [MIN_BLOCK_SIZE, MIN_BLOCK_SIZE, 300 * 1024 - 2 * MIN_BLOCK_SIZE]);
/// # Ok::<(), splitrs::ChunkError>(())
/// ```
#[derive(Debug)]
pub struct FixedSpanChunker<R> {
    reader: R,
    size: SizeHint,
    offset: u64,
    chunk_size: usize,
    finished: bool,
}

impl<R: Read> FixedSpanChunker<R> {
    /// Creates the standard chunker: the target size for `size`, replaced
    /// by `prior_sizes[0]` when that is within a factor of two, clamped to
    /// the protocol block size range.
    ///
    /// Only the first prior size is consulted; it stands for the whole
    /// previous chunking. It may be a short final block, hence the clamp.
    pub fn new(reader: R, size: SizeHint, prior_sizes: &[usize]) -> Self {
        let target = block_size::target_size(size);
        let prior = prior_sizes.first().copied();
        let chunk_size = block_size::clamp(block_size::stabilize(target, prior));

        debug!(
            "fixed-span chunker: size={:?} target={} prior={:?} chunk_size={}",
            size, target, prior, chunk_size
        );

        Self::build(reader, size, chunk_size)
    }

    /// Creates a chunker that uses exactly `chunk_size`, with no
    /// stabilization or clamping.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] if `chunk_size` is zero.
    pub fn with_chunk_size(reader: R, size: SizeHint, chunk_size: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::InvalidConfig {
                message: "chunk_size must be non-zero",
            });
        }
        Ok(Self::build(reader, size, chunk_size))
    }

    fn build(reader: R, size: SizeHint, chunk_size: usize) -> Self {
        Self {
            reader,
            size,
            offset: 0,
            chunk_size,
            finished: false,
        }
    }

    /// Returns the span every chunk but the last has.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the stream position of the next chunk.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of bytes to ask for next: one span, or less when the
    /// declared size says the stream ends sooner.
    fn read_len(&self) -> usize {
        match self.size {
            SizeHint::Known(total) => {
                let remaining = total.saturating_sub(self.offset);
                usize::try_from(remaining).map_or(self.chunk_size, |r| r.min(self.chunk_size))
            }
            SizeHint::Unknown => self.chunk_size,
        }
    }
}

impl<R: Read> Chunker for FixedSpanChunker<R> {
    /// Returns `(size + 1) / chunk_size` for a known size.
    ///
    /// This is an estimate: it undercounts by one when the size is not a
    /// multiple of `chunk_size` (25 bytes in spans of 10 gives 2, not 3).
    fn chunk_count_hint(&self) -> ChunkCountHint {
        match self.size {
            SizeHint::Known(total) => {
                let count = total.saturating_add(1) / self.chunk_size as u64;
                ChunkCountHint::known(usize::try_from(count).unwrap_or(usize::MAX))
            }
            SizeHint::Unknown => ChunkCountHint::UNKNOWN,
        }
    }

    fn next_chunk(&mut self) -> Result<Option<Chunk>, ChunkError> {
        if self.finished {
            return Ok(None);
        }
        if let SizeHint::Known(total) = self.size {
            if self.offset >= total {
                self.finished = true;
                return Ok(None);
            }
        }

        let mut data = Vec::with_capacity(self.read_len());
        let read = (&mut self.reader)
            .take(self.chunk_size as u64)
            .read_to_end(&mut data);
        if let Err(e) = read {
            self.finished = true;
            return Err(e.into());
        }

        if data.is_empty() {
            if let SizeHint::Known(total) = self.size {
                warn!(
                    "stream ended at {} bytes, {} bytes short of its declared size",
                    self.offset,
                    total - self.offset
                );
            }
            self.finished = true;
            return Ok(None);
        }

        // A short read means the stream is exhausted.
        if data.len() < self.chunk_size {
            self.finished = true;
        }

        let chunk = Chunk::new(data, self.offset);
        self.offset += self.chunk_size as u64;
        if let SizeHint::Known(total) = self.size {
            if self.offset >= total {
                self.finished = true;
            }
        }

        trace!("fixed-span chunk: {}", chunk);
        Ok(Some(chunk))
    }
}

/// Factory for the `"standard"` strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFactory;

impl ChunkerFactory for StandardFactory {
    fn new_chunker<'a>(
        &self,
        reader: Box<dyn Read + 'a>,
        size: SizeHint,
        prior_sizes: &[usize],
    ) -> Box<dyn Chunker + 'a> {
        Box::new(FixedSpanChunker::new(reader, size, prior_sizes))
    }
}
