//! Upstream access behind one trait.
//!
//! The relay and the HTTP handler talk to the upstream resource only through
//! `RangeSource`. Every method is blocking and is called from tokio's blocking
//! pool, one call per worker.

mod libcurl;
#[cfg(test)]
pub(crate) mod memory;

pub use libcurl::{CurlOptions, CurlSource};

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::control::CancelToken;
use crate::probe::{ProbeError, ProbeResult, UpstreamHeaders};
use crate::range::ByteRange;
use crate::relay::BodySink;
use crate::retry::FetchError;

pub trait RangeSource: Send + Sync {
    /// Total length plus the metadata mirrored on ranged responses.
    fn probe(&self, url: &str) -> Result<ProbeResult, ProbeError>;

    /// Fetch exactly `range` into memory. Must fail rather than return a
    /// short or empty payload, and should give up promptly once `cancel` is set.
    fn fetch_range(&self, url: &str, range: ByteRange, cancel: &CancelToken) -> Result<Bytes, FetchError>;

    /// Plain `GET` of the whole resource. Sends the final response headers on
    /// `head` once a 2xx response starts, then streams the body into `sink`.
    /// Returns the number of body bytes delivered. If `head` is dropped unsent,
    /// the returned error explains why.
    fn stream_full(
        &self,
        url: &str,
        head: oneshot::Sender<UpstreamHeaders>,
        sink: &BodySink,
    ) -> Result<u64, FetchError>;
}
