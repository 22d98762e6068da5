//! Chunk size bounds.
//!
//! [`ChunkConfig`] is the `(min, avg, max)` triple every bounded strategy
//! works with. The defaults are the protocol block size limits.
//!
//! # Example
//!
//! ```
//! use splitrs::{ChunkConfig, SizeHint};
//!
//! // Explicit bounds
//! let config = ChunkConfig::new(4096, 16384, 65536)?;
//!
//! // Bounds derived from the stream length
//! let config = ChunkConfig::for_size(SizeHint::Known(10 << 30));
//! assert!(config.avg_size() > config.min_size());
//! # Ok::<(), splitrs::ChunkError>(())
//! ```

use crate::block_size::{self, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, SizeHint};
use crate::error::ChunkError;

/// Smallest average size content-defined chunking accepts.
pub const MIN_CDC_AVG_SIZE: usize = 64;

/// Size bounds for chunking.
///
/// - `min_size` - no chunk except the last is smaller than this
/// - `avg_size` - target size for content-defined boundaries
/// - `max_size` - no chunk is larger than this
///
/// All sizes must be non-zero and ordered `min_size <= avg_size <= max_size`.
/// Content-defined chunking additionally needs `avg_size` to be a power of
/// two from 64 B to 16 MiB, see [`ChunkConfig::validate_for_cdc`].
///
/// # Example
///
/// ```
/// use splitrs::ChunkConfig;
///
/// let config = ChunkConfig::default()
///     .with_min_size(8192)
///     .with_avg_size(32768)
///     .with_max_size(131072);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkConfig {
    /// Minimum chunk size in bytes.
    min_size: usize,

    /// Average/target chunk size in bytes.
    avg_size: usize,

    /// Maximum chunk size in bytes.
    max_size: usize,
}

impl ChunkConfig {
    /// Creates a new configuration with the specified size bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] if:
    /// - Any size is zero
    /// - `min_size > avg_size` or `avg_size > max_size`
    ///
    /// # Example
    ///
    /// ```
    /// use splitrs::ChunkConfig;
    ///
    /// let config = ChunkConfig::new(10, 15, 20)?;
    /// assert_eq!(config.min_size(), 10);
    /// # Ok::<(), splitrs::ChunkError>(())
    /// ```
    pub fn new(min_size: usize, avg_size: usize, max_size: usize) -> Result<Self, ChunkError> {
        if min_size == 0 || avg_size == 0 || max_size == 0 {
            return Err(ChunkError::InvalidConfig {
                message: "chunk sizes must be non-zero",
            });
        }

        if min_size > avg_size {
            return Err(ChunkError::InvalidConfig {
                message: "min_size cannot be greater than avg_size",
            });
        }

        if avg_size > max_size {
            return Err(ChunkError::InvalidConfig {
                message: "avg_size cannot be greater than max_size",
            });
        }

        Ok(Self {
            min_size,
            avg_size,
            max_size,
        })
    }

    /// Returns the content-defined bounds for a stream of the given size:
    /// protocol minimum and maximum, average at the stream's target size.
    ///
    /// No prior-size stabilization is applied.
    pub fn for_size(hint: SizeHint) -> Self {
        Self {
            min_size: MIN_BLOCK_SIZE,
            avg_size: block_size::target_size(hint),
            max_size: MAX_BLOCK_SIZE,
        }
    }

    /// Sets the minimum chunk size.
    ///
    /// Note: This does not validate the configuration. Use [`ChunkConfig::validate`]
    /// to check if the configuration is valid.
    pub fn with_min_size(mut self, size: usize) -> Self {
        self.min_size = size;
        self
    }

    /// Sets the average/target chunk size.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_avg_size(mut self, size: usize) -> Self {
        self.avg_size = size;
        self
    }

    /// Sets the maximum chunk size.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Returns the minimum chunk size.
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Returns the average/target chunk size.
    pub fn avg_size(&self) -> usize {
        self.avg_size
    }

    /// Returns the maximum chunk size.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Validates the current configuration.
    ///
    /// ```
    /// use splitrs::ChunkConfig;
    ///
    /// let config = ChunkConfig::default().with_min_size(0);
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ChunkError> {
        Self::new(self.min_size, self.avg_size, self.max_size).map(|_| ())
    }

    /// Validates the configuration for content-defined chunking.
    ///
    /// On top of [`ChunkConfig::validate`], the average size must be a power
    /// of two from [`MIN_CDC_AVG_SIZE`] to [`MAX_BLOCK_SIZE`], the range the
    /// boundary masks cover.
    pub fn validate_for_cdc(&self) -> Result<(), ChunkError> {
        self.validate()?;

        if !self.avg_size.is_power_of_two() {
            return Err(ChunkError::InvalidConfig {
                message: "avg_size must be a power of two",
            });
        }

        if self.avg_size < MIN_CDC_AVG_SIZE {
            return Err(ChunkError::InvalidConfig {
                message: "avg_size is below 64 bytes",
            });
        }

        if self.avg_size > MAX_BLOCK_SIZE {
            return Err(ChunkError::InvalidConfig {
                message: "avg_size is above MAX_BLOCK_SIZE",
            });
        }

        Ok(())
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            min_size: MIN_BLOCK_SIZE,
            avg_size: MIN_BLOCK_SIZE,
            max_size: MAX_BLOCK_SIZE,
        }
    }
}
