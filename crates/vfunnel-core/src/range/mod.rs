//! Byte-range math and `Range` header parsing.
//!
//! `ByteRange` is always inclusive on both ends, matching the wire format of
//! `Range: bytes=a-b` and `Content-Range: bytes a-b/total`.

mod byte_range;
mod parse;

pub use byte_range::ByteRange;
pub use parse::{RangeError, RangeRequest};
