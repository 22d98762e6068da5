//! Content-defined boundary detection.
//!
//! - [`FastCdc`] - FastCDC gear rolling hash

mod fastcdc;

pub use fastcdc::FastCdc;
