//! Chunk types.
//!
//! - [`Chunk`] - Segment of a stream with its offset

mod data;

pub use data::Chunk;
