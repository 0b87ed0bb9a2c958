//! Range math and planning.
//!
//! Splits a known content length into contiguous inclusive byte ranges, one
//! per worker.

mod range;

pub use range::{plan_ranges, ByteRange};
