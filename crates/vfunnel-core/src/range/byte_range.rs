use std::fmt;

/// Inclusive byte interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Builds a range, or `None` when `end < start`.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Number of bytes covered. Never zero.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for a request `Range` header: `bytes=start-end`.
    pub fn range_header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }

    /// Value for a response `Content-Range` header: `bytes start-end/total`.
    pub fn content_range_value(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// `start-end`, the form libcurl's `CURLOPT_RANGE` expects.
impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
