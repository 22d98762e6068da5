//! splitrs
//!
//! Stream splitting for block-based synchronization.
//!
//! `splitrs` divides a byte stream into contiguous chunks for
//! content-addressed storage and incremental sync. Three strategies share
//! one pull-based contract, [`Chunker`]:
//!
//! - `"standard"` - fixed-size blocks from the protocol block size ladder,
//!   stabilized against the size used last time ([`FixedSpanChunker`])
//! - `"zeropattern"` - cuts after eight zero bytes ([`PatternBoundaryChunker`])
//! - `"fastcdc"` - content-defined cuts from a rolling gear hash
//!   ([`ContentDefinedChunker`])
//!
//! The crate intentionally:
//! - does NOT hash chunks
//! - does NOT persist chunks
//! - does NOT open files or walk directories
//!
//! It only does one thing: **Read bytes → yield chunks**
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use splitrs::{ChunkError, Chunker, SizeHint, StrategyRegistry};
//!
//! fn main() -> Result<(), ChunkError> {
//!     let registry = StrategyRegistry::with_defaults();
//!     let factory = registry.default_factory().expect("fastcdc is registered");
//!
//!     let file = File::open("data.bin")?;
//!     let size = SizeHint::Known(file.metadata()?.len());
//!
//!     for chunk in factory.new_chunker(Box::new(file), size, &[]).chunks() {
//!         let chunk = chunk?;
//!         println!("{} bytes at {}", chunk.len(), chunk.offset);
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod block_size;
mod chunk;
mod chunker;
mod config;
mod error;
mod registry;

mod buffer; // internal look-ahead buffer
mod cdc; // fastcdc boundary detector

//
// Public surface
//

pub use block_size::{MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, SizeHint};
pub use cdc::FastCdc;
pub use chunk::Chunk;
pub use chunker::{
    ChunkCountHint, ChunkIter, Chunker, ContentDefinedChunker, Decision, FastCdcFactory, FixedSpanChunker,
    PatternBoundaryChunker, PatternRule, StandardFactory, ZERO_PATTERN, ZeroPatternFactory,
};
pub use config::{ChunkConfig, MIN_CDC_AVG_SIZE};
pub use error::ChunkError;
pub use registry::{ChunkerFactory, DEFAULT_STRATEGY, FASTCDC, STANDARD, StrategyRegistry, ZEROPATTERN};
