//! libcurl-backed `RangeSource`.

use bytes::Bytes;
use curl::easy::{Easy, Easy2, Handler};
use std::time::Duration;
use tokio::sync::oneshot;

use super::RangeSource;
use crate::config::FunnelConfig;
use crate::control::CancelToken;
use crate::fetcher;
use crate::probe::{self, ProbeError, ProbeResult, UpstreamHeaders};
use crate::range::ByteRange;
use crate::relay::BodySink;
use crate::retry::FetchError;

/// Transfer limits applied to every upstream request.
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Hard limit for probes and block fetches.
    pub fetch_timeout: Duration,
}

impl From<&FunnelConfig> for CurlOptions {
    fn from(cfg: &FunnelConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            fetch_timeout: cfg.fetch_timeout(),
        }
    }
}

impl CurlOptions {
    /// Easy handle for probes: redirects followed, hard timeout.
    pub(crate) fn easy(&self, url: &str) -> Result<Easy, curl::Error> {
        let mut easy = Easy::new();
        easy.url(url)?;
        easy.signal(false)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.fetch_timeout)?;
        Ok(easy)
    }

    /// Easy2 handle for one block fetch: hard timeout, progress callback on
    /// so the handler can abort on cancellation.
    pub(crate) fn block_easy<H: Handler>(&self, url: &str, handler: H) -> Result<Easy2<H>, curl::Error> {
        let mut easy = Easy2::new(handler);
        easy.url(url)?;
        easy.signal(false)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.fetch_timeout)?;
        easy.progress(true)?;
        Ok(easy)
    }

    /// Easy2 handle for a whole-resource stream. A full video can take far
    /// longer than one block, so only a low-speed limit applies.
    pub(crate) fn streaming_easy<H: Handler>(&self, url: &str, handler: H) -> Result<Easy2<H>, curl::Error> {
        let mut easy = Easy2::new(handler);
        easy.url(url)?;
        easy.signal(false)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.connect_timeout)?;
        // Abort if throughput drops below 1 KiB/s for the fetch timeout.
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(self.fetch_timeout)?;
        Ok(easy)
    }
}

/// Talks to real upstream servers over libcurl. Stateless: each call builds
/// its own handle, so one instance is shared by all requests.
#[derive(Debug, Clone)]
pub struct CurlSource {
    opts: CurlOptions,
}

impl CurlSource {
    pub fn new(opts: CurlOptions) -> Self {
        Self { opts }
    }
}

impl RangeSource for CurlSource {
    fn probe(&self, url: &str) -> Result<ProbeResult, ProbeError> {
        probe::probe(url, &self.opts)
    }

    fn fetch_range(&self, url: &str, range: ByteRange, cancel: &CancelToken) -> Result<Bytes, FetchError> {
        fetcher::fetch_range(url, range, &self.opts, cancel)
    }

    fn stream_full(
        &self,
        url: &str,
        head: oneshot::Sender<UpstreamHeaders>,
        sink: &BodySink,
    ) -> Result<u64, FetchError> {
        fetcher::stream_full(url, &self.opts, head, sink)
    }
}
