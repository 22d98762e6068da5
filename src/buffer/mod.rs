//! Internal look-ahead buffer for the scanning strategies.
//!
//! This module is an implementation detail and not part of the public API.

mod scan;

pub(crate) use scan::ScanBuffer;
