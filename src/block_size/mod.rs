//! Block size calculation.
//!
//! The protocol layer works with a fixed ladder of power-of-two block
//! sizes. Large streams get large blocks so the number of blocks per file
//! stays bounded. A previously used block size is preferred over the
//! freshly computed one when the two are within a factor of two, so a file
//! that merely grew across a size bucket is not rechunked from scratch.

/// Smallest block size understood by the protocol (128 KiB).
pub const MIN_BLOCK_SIZE: usize = 128 << 10;

/// Largest block size understood by the protocol (16 MiB).
pub const MAX_BLOCK_SIZE: usize = 16 << 20;

/// Number of blocks per file the size ladder aims for.
pub const DESIRED_PER_FILE_BLOCKS: u64 = 2000;

/// All block sizes in ascending order, `MIN_BLOCK_SIZE` through
/// `MAX_BLOCK_SIZE`.
pub const BLOCK_SIZES: [usize; 8] = block_sizes();

const fn block_sizes() -> [usize; 8] {
    let mut sizes = [0usize; 8];
    let mut i = 0;
    while i < sizes.len() {
        sizes[i] = MIN_BLOCK_SIZE << i;
        i += 1;
    }
    sizes
}

/// Total length of a stream, if known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SizeHint {
    /// The stream is exactly this many bytes long.
    Known(u64),
    /// The length is not known up front.
    #[default]
    Unknown,
}

impl SizeHint {
    /// Returns the known length, if any.
    pub fn known(self) -> Option<u64> {
        match self {
            SizeHint::Known(size) => Some(size),
            SizeHint::Unknown => None,
        }
    }
}

impl From<u64> for SizeHint {
    fn from(size: u64) -> Self {
        SizeHint::Known(size)
    }
}

impl From<Option<u64>> for SizeHint {
    fn from(size: Option<u64>) -> Self {
        size.map_or(SizeHint::Unknown, SizeHint::Known)
    }
}

/// Returns the protocol block size for a file of `total` bytes: the
/// smallest size that keeps the file under `DESIRED_PER_FILE_BLOCKS`
/// blocks, or `MAX_BLOCK_SIZE` if none does.
pub fn block_size(total: u64) -> usize {
    BLOCK_SIZES
        .iter()
        .copied()
        .find(|&size| total < DESIRED_PER_FILE_BLOCKS * size as u64)
        .unwrap_or(MAX_BLOCK_SIZE)
}

/// Clamps a block size into `[MIN_BLOCK_SIZE, MAX_BLOCK_SIZE]`.
pub fn clamp(size: usize) -> usize {
    size.clamp(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE)
}

/// Returns the target chunk size for a stream.
///
/// An unknown length is treated like an empty stream and gets the smallest
/// block size.
pub fn target_size(hint: SizeHint) -> usize {
    let size = match hint {
        SizeHint::Known(total) => block_size(total),
        SizeHint::Unknown => MIN_BLOCK_SIZE,
    };
    clamp(size)
}

/// Prefers `prior` over `new` when they are within a factor of two of
/// each other.
///
/// Returns `prior` iff it is present, nonzero, and
/// `prior / 2 <= new <= 2 * prior`; otherwise returns `new`.
pub fn stabilize(new: usize, prior: Option<usize>) -> usize {
    match prior {
        Some(prior) if prior > 0 && within_factor_two(new, prior) => prior,
        _ => new,
    }
}

fn within_factor_two(a: usize, b: usize) -> bool {
    let (a, b) = (a as u128, b as u128);
    a <= 2 * b && b <= 2 * a
}
