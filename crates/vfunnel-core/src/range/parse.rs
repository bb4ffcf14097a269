//! `Range` request header parsing and resolution against the upstream length.

use super::ByteRange;

/// A single-range request as sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// `bytes=start-` or `bytes=start-end`.
    From { start: u64, end: Option<u64> },
    /// `bytes=-n`: the last `n` bytes.
    Suffix(u64),
}

impl Default for RangeRequest {
    /// Whole resource, end resolved against the upstream length.
    fn default() -> Self {
        RangeRequest::From {
            start: 0,
            end: None,
        }
    }
}

/// The requested range cannot be served from a resource of `total` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("range not satisfiable for {total}-byte resource")]
pub struct RangeError {
    pub total: u64,
}

impl RangeRequest {
    /// Parses a `Range` header. Never fails: malformed input falls back to
    /// `RangeRequest::default()`. Only the first range of a multi-range
    /// header is honored.
    pub fn parse(header: &str) -> Self {
        match parse_strict(header) {
            Some(req) => req,
            None => {
                tracing::debug!("malformed Range header {:?}, serving from offset 0", header);
                RangeRequest::default()
            }
        }
    }

    /// Resolves against the upstream length into a concrete inclusive span.
    /// An explicit end past the resource is clamped to the last byte.
    pub fn resolve(&self, total: u64) -> Result<ByteRange, RangeError> {
        let unsatisfiable = RangeError { total };
        if total == 0 {
            return Err(unsatisfiable);
        }
        let last = total - 1;
        match *self {
            RangeRequest::From { start, end } => {
                let end = end.map_or(last, |e| e.min(last));
                ByteRange::new(start, end).ok_or(unsatisfiable)
            }
            RangeRequest::Suffix(0) => Err(unsatisfiable),
            RangeRequest::Suffix(n) => Ok(ByteRange {
                start: total - n.min(total),
                end: last,
            }),
        }
    }
}

fn parse_strict(header: &str) -> Option<RangeRequest> {
    let (unit, spec) = header.trim().split_once('=')?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return None;
    }
    let mut ranges = spec.split(',');
    let first = ranges.next()?.trim();
    if ranges.next().is_some() {
        tracing::debug!("multi-range header {:?}, honoring only {:?}", header, first);
    }
    let (start, end) = first.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        return end.parse().ok().map(RangeRequest::Suffix);
    }
    let start = start.parse().ok()?;
    let end = if end.is_empty() {
        None
    } else {
        Some(end.parse().ok()?)
    };
    // `bytes=20-10` is syntactically invalid, not unsatisfiable.
    if end.is_some_and(|e| e < start) {
        return None;
    }
    Some(RangeRequest::From { start, end })
}
