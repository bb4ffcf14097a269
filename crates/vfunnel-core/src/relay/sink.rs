//! Response body sink.
//!
//! The response head is sent before any body bytes, so the sink only carries
//! data. An `Err` item terminates the body abnormally, which makes hyper drop
//! the connection instead of ending the response cleanly.

use bytes::Bytes;
use std::io;
use tokio::sync::mpsc;

/// One body item: data, or the error that aborts the response.
pub type BodyChunk = Result<Bytes, io::Error>;

/// The receiving side of the body channel, owned by the HTTP response.
pub type BodyReceiver = mpsc::Receiver<BodyChunk>;

/// The client stopped reading (connection closed or response dropped).
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("client disconnected")]
pub struct SinkClosed;

/// Write-only handle on a response body.
#[derive(Debug, Clone)]
pub struct BodySink {
    tx: mpsc::Sender<BodyChunk>,
}

/// Creates a sink and the receiver the response body is built from.
/// `depth` bounds how many chunks may wait for the client.
pub fn body_channel(depth: usize) -> (BodySink, BodyReceiver) {
    let (tx, rx) = mpsc::channel(depth.max(1));
    (BodySink { tx }, rx)
}

impl BodySink {
    pub async fn write(&self, data: Bytes) -> Result<(), SinkClosed> {
        self.tx.send(Ok(data)).await.map_err(|_| SinkClosed)
    }

    /// For use on blocking worker threads (curl callbacks), never on an async task.
    pub fn blocking_write(&self, data: Bytes) -> Result<(), SinkClosed> {
        self.tx.blocking_send(Ok(data)).map_err(|_| SinkClosed)
    }

    /// Terminate the body with an error so the client sees an aborted response.
    pub async fn fail(&self, reason: String) {
        let _ = self.tx.send(Err(io::Error::other(reason))).await;
    }

    /// Resolves once the client side of the body is gone.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}
