//! Fetch unit: one worker's assignment.

use crate::range::ByteRange;

/// A contiguous block of the upstream resource assigned to one worker.
///
/// `index` is the unit's position within its request; units are delivered to
/// the client in ascending `index` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchUnit {
    pub index: usize,
    pub range: ByteRange,
}
