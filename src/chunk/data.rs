//! The Chunk type - one contiguous segment of a stream.

use bytes::{Buf, Bytes};
use std::fmt;
use std::io::Read;

/// A contiguous segment of the input stream.
///
/// The data is owned by the chunk; the chunker keeps no reference to it
/// once it has been returned.
///
/// # Example
///
/// ```
/// use splitrs::Chunk;
/// use std::io::Read;
///
/// let chunk = Chunk::new(&b"hello world"[..], 100);
/// assert_eq!(chunk.len(), 11);
/// assert_eq!(chunk.range(), 100..111);
///
/// let mut text = String::new();
/// chunk.reader().read_to_string(&mut text)?;
/// assert_eq!(text, "hello world");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk data.
    pub data: Bytes,

    /// The offset of the first byte in the original stream.
    pub offset: u64,
}

impl Chunk {
    /// Creates a new chunk starting at `offset`.
    pub fn new(data: impl Into<Bytes>, offset: u64) -> Self {
        Self {
            data: data.into(),
            offset,
        }
    }

    /// Returns the length of the chunk data.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the chunk has no data.
    ///
    /// Chunkers never emit empty chunks.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns a reference to the chunk data.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns the start offset.
    pub fn start(&self) -> u64 {
        self.offset
    }

    /// Returns the end offset (exclusive).
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }

    /// Returns the chunk as a range.
    pub fn range(&self) -> std::ops::Range<u64> {
        self.start()..self.end()
    }

    /// Returns a reader over the chunk data.
    pub fn reader(&self) -> impl Read + use<> {
        self.data.clone().reader()
    }

    /// Consumes the chunk and returns the underlying data.
    pub fn into_data(self) -> Bytes {
        self.data
    }
}

impl AsRef<[u8]> for Chunk {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chunk({} bytes @ {})", self.len(), self.offset)
    }
}
