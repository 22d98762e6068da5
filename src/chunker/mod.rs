//! Chunking strategies behind one pull-based contract.
//!
//! - [`Chunker`] - the contract every strategy implements
//! - [`FixedSpanChunker`] - fixed-size chunks, size from the block size ladder
//! - [`PatternBoundaryChunker`] - cuts after a fixed byte pattern
//! - [`ContentDefinedChunker`] - FastCDC content-defined cuts
//! - [`ChunkIter`] - adapts any chunker into an [`Iterator`]

mod cdc;
mod fixed;
mod iter;
mod pattern;

pub use cdc::{ContentDefinedChunker, FastCdcFactory};
pub use fixed::{FixedSpanChunker, StandardFactory};
pub use iter::ChunkIter;
pub use pattern::{Decision, PatternBoundaryChunker, PatternRule, ZERO_PATTERN, ZeroPatternFactory};

use crate::chunk::Chunk;
use crate::error::ChunkError;

/// Best-effort total number of chunks a chunker will produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCountHint {
    /// The estimate. Meaningless when `exact` is false.
    pub value: usize,
    /// Whether the strategy could compute the estimate at all.
    pub exact: bool,
}

impl ChunkCountHint {
    /// The count is not known in advance.
    pub const UNKNOWN: Self = Self {
        value: 0,
        exact: false,
    };

    /// A count computed from the declared stream size.
    pub const fn known(value: usize) -> Self {
        Self { value, exact: true }
    }
}

/// A stream splitter.
///
/// Call [`Chunker::next_chunk`] until it returns `Ok(None)`. The emitted
/// chunks are contiguous, never empty, and concatenate to the input
/// stream. After an error the read position is unspecified and the chunker
/// should be dropped.
///
/// # Example
///
/// ```
/// use splitrs::{Chunker, FixedSpanChunker, SizeHint};
///
/// let data = vec![0u8; 25];
/// let mut chunker = FixedSpanChunker::with_chunk_size(&data[..], SizeHint::Known(25), 10)?;
///
/// let mut lens = Vec::new();
/// while let Some(chunk) = chunker.next_chunk()? {
///     lens.push(chunk.len());
/// }
/// assert_eq!(lens, [10, 10, 5]);
/// # Ok::<(), splitrs::ChunkError>(())
/// ```
pub trait Chunker {
    /// Returns the expected number of chunks, if the strategy knows it.
    fn chunk_count_hint(&self) -> ChunkCountHint;

    /// Returns the next chunk, or `Ok(None)` at end of stream.
    fn next_chunk(&mut self) -> Result<Option<Chunk>, ChunkError>;

    /// Turns the chunker into an iterator of chunks.
    fn chunks(self) -> ChunkIter<Self>
    where
        Self: Sized,
    {
        ChunkIter::new(self)
    }
}

impl<C: Chunker + ?Sized> Chunker for Box<C> {
    fn chunk_count_hint(&self) -> ChunkCountHint {
        (**self).chunk_count_hint()
    }

    fn next_chunk(&mut self) -> Result<Option<Chunk>, ChunkError> {
        (**self).next_chunk()
    }
}
