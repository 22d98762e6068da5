//! Iterator adapter over a [`Chunker`].

use std::iter::FusedIterator;

use super::Chunker;
use crate::chunk::Chunk;
use crate::error::ChunkError;

/// An iterator that yields chunks from a [`Chunker`].
///
/// The iterator ends after the last chunk or after the first error.
///
/// # Example
///
/// ```
/// use splitrs::{Chunker, PatternBoundaryChunker};
///
/// let data = b"aaaa|bbbb|cccc";
/// let chunker = PatternBoundaryChunker::new(&data[..], 2, 8, b"|")?;
///
/// let parts: Vec<_> = chunker.chunks().collect::<Result<_, _>>()?;
/// assert_eq!(parts.len(), 3);
/// assert_eq!(&parts[0].data[..], b"aaaa|");
/// # Ok::<(), splitrs::ChunkError>(())
/// ```
#[derive(Debug)]
pub struct ChunkIter<C> {
    chunker: C,
    finished: bool,
}

impl<C: Chunker> ChunkIter<C> {
    /// Wraps a chunker.
    pub fn new(chunker: C) -> Self {
        Self {
            chunker,
            finished: false,
        }
    }

    /// Returns the wrapped chunker.
    pub fn into_inner(self) -> C {
        self.chunker
    }
}

impl<C: Chunker> Iterator for ChunkIter<C> {
    type Item = Result<Chunk, ChunkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.chunker.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<C: Chunker> FusedIterator for ChunkIter<C> {}
