//! Whole-resource GET relayed chunk by chunk (no `Range` from the client).

use bytes::Bytes;
use curl::easy::{Handler, WriteError};
use tokio::sync::oneshot;

use crate::probe::{collect_header_line, parse_headers, UpstreamHeaders};
use crate::relay::BodySink;
use crate::retry::FetchError;
use crate::source::CurlOptions;

/// Easy2 handler that forwards the head once, then every body chunk.
pub(super) struct PassthroughHandler {
    response_headers: Vec<String>,
    head: Option<oneshot::Sender<UpstreamHeaders>>,
    sink: BodySink,
    /// Non-2xx status seen on the first body write.
    rejected: Option<u32>,
    client_gone: bool,
    sent: u64,
}

impl PassthroughHandler {
    pub(super) fn new(head: oneshot::Sender<UpstreamHeaders>, sink: BodySink) -> Self {
        Self {
            response_headers: Vec::new(),
            head: Some(head),
            sink,
            rejected: None,
            client_gone: false,
            sent: 0,
        }
    }

    /// Sends the head if not sent yet. Returns false when the transfer should stop.
    fn send_head(&mut self) -> bool {
        let Some(tx) = self.head.take() else {
            return self.rejected.is_none() && !self.client_gone;
        };
        let headers = parse_headers(&self.response_headers);
        match headers.status {
            Some(code) if (200..300).contains(&code) => {
                if tx.send(headers).is_err() {
                    self.client_gone = true;
                    return false;
                }
                true
            }
            other => {
                self.rejected = Some(other.unwrap_or(0));
                false
            }
        }
    }
}

impl Handler for PassthroughHandler {
    fn header(&mut self, data: &[u8]) -> bool {
        collect_header_line(&mut self.response_headers, data);
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if !self.send_head() {
            return Ok(0);
        }
        match self.sink.blocking_write(Bytes::copy_from_slice(data)) {
            Ok(()) => {
                self.sent += data.len() as u64;
                Ok(data.len())
            }
            Err(_) => {
                self.client_gone = true;
                Ok(0)
            }
        }
    }
}

/// Streams the whole of `url` into `sink`. Blocking; runs on a worker thread.
///
/// `head` receives the final response headers before the first body chunk
/// (or after the transfer for an empty body). On failure before that point
/// `head` is dropped unsent and the error is returned.
pub fn stream_full(
    url: &str,
    opts: &CurlOptions,
    head: oneshot::Sender<UpstreamHeaders>,
    sink: &BodySink,
) -> Result<u64, FetchError> {
    let mut easy = opts.streaming_easy(url, PassthroughHandler::new(head, sink.clone()))?;
    let performed = easy.perform();
    let code = easy.response_code()?;
    let handler = easy.get_mut();

    if let Some(code) = handler.rejected {
        return Err(FetchError::Http(code));
    }
    if handler.client_gone {
        return Err(FetchError::Cancelled);
    }
    performed?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }
    // Empty body: no write callback ever fired.
    if !handler.send_head() {
        return Err(FetchError::Cancelled);
    }
    Ok(handler.sent)
}
