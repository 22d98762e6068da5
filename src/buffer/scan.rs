//! Bounded, growable look-ahead buffer.

use std::io::{self, Read};

use bytes::{Bytes, BytesMut};

/// Largest single read issued against the stream (64 KiB).
pub const READ_SIZE: usize = 64 * 1024;

/// A byte buffer that is filled from a reader and never grows past its
/// capacity.
///
/// Memory is allocated as data arrives, so a 16 MiB capacity costs nothing
/// for a 1 KiB stream.
#[derive(Debug)]
pub(crate) struct ScanBuffer {
    data: BytesMut,
    capacity: usize,
}

impl ScanBuffer {
    /// Creates an empty buffer that holds at most `capacity` bytes.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity.min(READ_SIZE)),
            capacity,
        }
    }

    /// Returns the buffered bytes.
    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if no more bytes fit.
    pub(crate) fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reads once from `reader` into the free space.
    ///
    /// Returns the number of bytes appended; 0 means end of stream.
    /// Interrupted reads are retried. On error the buffered bytes are left
    /// untouched.
    pub(crate) fn fill<R: Read + ?Sized>(&mut self, reader: &mut R) -> io::Result<usize> {
        debug_assert!(!self.is_full(), "fill called on a full buffer");

        let start = self.data.len();
        let want = (self.capacity - start).min(READ_SIZE);
        self.data.resize(start + want, 0);

        loop {
            match reader.read(&mut self.data[start..]) {
                Ok(n) => {
                    self.data.truncate(start + n);
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.data.truncate(start);
                    return Err(e);
                }
            }
        }
    }

    /// Removes the first `len` bytes and returns them.
    pub(crate) fn split_to(&mut self, len: usize) -> Bytes {
        self.data.split_to(len).freeze()
    }
}
