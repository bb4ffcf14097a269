//! In-memory `RangeSource` for tests: per-block delays to scramble
//! completion order, injected failures, and counters for cancellation.

use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

use super::RangeSource;
use crate::control::CancelToken;
use crate::probe::{ProbeError, ProbeResult, UpstreamHeaders};
use crate::range::ByteRange;
use crate::relay::BodySink;
use crate::retry::FetchError;

#[derive(Debug, Default)]
pub(crate) struct MemorySource {
    body: Bytes,
    etag: Option<String>,
    /// Delay before answering a block, keyed by block start offset.
    delays: HashMap<u64, Duration>,
    /// Block start offsets that answer HTTP 500.
    failing: HashSet<u64>,
    probe_fails: bool,
    /// Whole-resource stream fails after this many bytes.
    stream_fails_after: Option<usize>,
    pub(crate) fetches: AtomicUsize,
    pub(crate) cancelled: AtomicUsize,
}

impl MemorySource {
    pub(crate) fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            etag: Some("\"mem-1\"".to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn with_delay(mut self, start: u64, delay: Duration) -> Self {
        self.delays.insert(start, delay);
        self
    }

    pub(crate) fn failing_at(mut self, start: u64) -> Self {
        self.failing.insert(start);
        self
    }

    pub(crate) fn with_failing_probe(mut self) -> Self {
        self.probe_fails = true;
        self
    }

    pub(crate) fn with_stream_failure_after(mut self, bytes: usize) -> Self {
        self.stream_fails_after = Some(bytes);
        self
    }

    pub(crate) fn body(&self) -> &Bytes {
        &self.body
    }
}

impl RangeSource for MemorySource {
    fn probe(&self, _url: &str) -> Result<ProbeResult, ProbeError> {
        if self.probe_fails {
            return Err(ProbeError::Http(503));
        }
        Ok(ProbeResult {
            total_length: self.body.len() as u64,
            content_type: Some("video/mp4".to_string()),
            etag: self.etag.clone(),
        })
    }

    fn fetch_range(&self, _url: &str, range: ByteRange, cancel: &CancelToken) -> Result<Bytes, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&range.start) {
            if !cancel.sleep(*delay) {
                self.cancelled.fetch_add(1, Ordering::SeqCst);
                return Err(FetchError::Cancelled);
            }
        }
        if self.failing.contains(&range.start) {
            return Err(FetchError::Http(500));
        }
        let len = self.body.len() as u64;
        if range.end >= len {
            return Err(FetchError::PartialTransfer {
                expected: range.len(),
                received: len.saturating_sub(range.start),
            });
        }
        Ok(self.body.slice(range.start as usize..=range.end as usize))
    }

    fn stream_full(
        &self,
        _url: &str,
        head: oneshot::Sender<UpstreamHeaders>,
        sink: &BodySink,
    ) -> Result<u64, FetchError> {
        let headers = UpstreamHeaders {
            status: Some(200),
            content_length: Some(self.body.len() as u64),
            content_range: None,
            content_type: Some("video/mp4".to_string()),
            etag: self.etag.clone(),
            accept_ranges: true,
        };
        if head.send(headers).is_err() {
            return Err(FetchError::Cancelled);
        }
        let limit = self.stream_fails_after.unwrap_or(self.body.len());
        let mut sent = 0usize;
        for chunk in self.body[..limit.min(self.body.len())].chunks(7) {
            sink.blocking_write(Bytes::copy_from_slice(chunk))
                .map_err(|_| FetchError::Cancelled)?;
            sent += chunk.len();
        }
        if self.stream_fails_after.is_some() {
            return Err(FetchError::PartialTransfer {
                expected: self.body.len() as u64,
                received: sent as u64,
            });
        }
        Ok(sent as u64)
    }
}
