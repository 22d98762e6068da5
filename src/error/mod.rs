//! Error types for splitrs.
//!
//! End of stream is not an error: chunkers signal it with `Ok(None)`.

use std::fmt;

/// Errors that can occur while splitting a stream.
#[derive(Debug)]
pub enum ChunkError {
    /// The underlying stream failed during a read. Returned verbatim.
    Io(std::io::Error),

    /// The look-ahead buffer is full but the scanner still cannot decide a
    /// boundary.
    ///
    /// This is a configuration defect, not a data error: the chunk bounds
    /// and the buffer capacity disagree.
    BufferExhausted {
        /// Bytes held in the buffer when the scanner gave up.
        buffered: usize,
        /// The configured buffer capacity.
        max: usize,
    },

    /// Invalid construction parameter.
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },
}

impl ChunkError {
    /// Returns true if the error points at a configuration defect rather
    /// than at the data or the stream.
    pub fn is_config_defect(&self) -> bool {
        matches!(
            self,
            ChunkError::BufferExhausted { .. } | ChunkError::InvalidConfig { .. }
        )
    }
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkError::Io(e) => write!(f, "io error: {}", e),
            ChunkError::BufferExhausted { buffered, max } => {
                write!(
                    f,
                    "scan buffer exhausted: {} bytes buffered (max {}) without a boundary",
                    buffered, max
                )
            }
            ChunkError::InvalidConfig { message } => {
                write!(f, "invalid config: {}", message)
            }
        }
    }
}

impl std::error::Error for ChunkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChunkError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ChunkError {
    fn from(e: std::io::Error) -> Self {
        ChunkError::Io(e)
    }
}
