//! Fetch error type for retry classification.

/// Error returned by a single upstream fetch. Kept separate from `anyhow` so
/// callers can classify it and decide on retries.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Transport(#[from] curl::Error),
    /// Upstream answered with a status other than 200/206.
    #[error("HTTP {0}")]
    Http(u32),
    /// 206 whose `Content-Range` does not describe the requested block.
    #[error("upstream sent {got:?} for requested bytes {want}")]
    RangeMismatch { want: String, got: String },
    /// Upstream ignored `Range` and sent the whole body for a block not at offset 0.
    #[error("upstream ignored Range for block starting at {start}")]
    RangeIgnored { start: u64 },
    /// Body length differs from the block length (server closed early, or sent too much).
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// The request was cancelled (client gone or a sibling fetch failed).
    #[error("fetch cancelled")]
    Cancelled,
    /// The blocking worker panicked or was torn down.
    #[error("fetch worker failed: {0}")]
    Worker(String),
}
