//! Ordered relay of a byte span.
//!
//! The span is planned into blocks; each batch of up to `pool_size` blocks is
//! fetched concurrently on the blocking pool, and the results are written to
//! the client strictly in block order. A block that finishes early waits in its
//! join handle until every block before it has been written.

mod sink;

pub use sink::{body_channel, BodyChunk, BodyReceiver, BodySink, SinkClosed};

use bytes::Bytes;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::FunnelConfig;
use crate::control::{CancelOnDrop, CancelToken};
use crate::planner::{ChunkPlan, FetchUnit};
use crate::range::ByteRange;
use crate::retry::{run_with_retry, FetchError, RetryPolicy};
use crate::source::RangeSource;

/// Per-process relay settings, passed explicitly to every request.
#[derive(Debug, Clone, Copy)]
pub struct RelayConfig {
    /// Blocks fetched concurrently per request.
    pub pool_size: usize,
    /// Maximum bytes per block.
    pub block_size: u64,
    pub retry: RetryPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig::from(&FunnelConfig::default())
    }
}

impl From<&FunnelConfig> for RelayConfig {
    fn from(cfg: &FunnelConfig) -> Self {
        Self {
            pool_size: cfg.pool_size.max(1),
            block_size: cfg.block_size.max(1),
            retry: cfg
                .retry
                .as_ref()
                .map(RetryPolicy::from)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A block could not be fetched; the response must be aborted.
    #[error("block {index} (bytes {range}) failed: {source}")]
    Fetch {
        index: usize,
        range: ByteRange,
        #[source]
        source: FetchError,
    },
    /// The client stopped reading after `delivered` bytes.
    #[error("client disconnected after {delivered} bytes")]
    ClientGone { delivered: u64 },
}

/// Fetches `span` of `url` and writes it to `sink` in ascending offset order.
///
/// Returns the number of bytes delivered. On any failure all in-flight fetches
/// of this request are cancelled before returning; the caller decides how to
/// terminate the response.
pub async fn relay_span(
    source: Arc<dyn RangeSource>,
    url: Arc<str>,
    span: ByteRange,
    cfg: &RelayConfig,
    sink: &BodySink,
) -> Result<u64, RelayError> {
    let cancel = CancelToken::new();
    let _guard = CancelOnDrop(cancel.clone());
    let mut delivered = 0u64;

    for batch in ChunkPlan::new(span, cfg.block_size, cfg.pool_size) {
        let pending: Vec<(FetchUnit, JoinHandle<Result<Bytes, FetchError>>)> = batch
            .into_iter()
            .map(|unit| {
                let handle = spawn_fetch(Arc::clone(&source), Arc::clone(&url), unit, cfg.retry, cancel.clone());
                (unit, handle)
            })
            .collect();

        for (unit, mut handle) in pending {
            let joined = tokio::select! {
                biased;
                joined = &mut handle => joined,
                _ = sink.closed() => {
                    cancel.cancel();
                    return Err(RelayError::ClientGone { delivered });
                }
            };
            let result = match joined {
                Ok(r) => r,
                Err(e) => Err(FetchError::Worker(e.to_string())),
            };
            let payload = match result {
                Ok(p) => p,
                Err(source) => {
                    cancel.cancel();
                    return Err(RelayError::Fetch {
                        index: unit.index,
                        range: unit.range,
                        source,
                    });
                }
            };
            let len = payload.len() as u64;
            if sink.write(payload).await.is_err() {
                cancel.cancel();
                return Err(RelayError::ClientGone { delivered });
            }
            delivered += len;
            tracing::trace!("block {} ({}) written", unit.index, unit.range);
        }
    }

    Ok(delivered)
}

fn spawn_fetch(
    source: Arc<dyn RangeSource>,
    url: Arc<str>,
    unit: FetchUnit,
    policy: RetryPolicy,
    cancel: CancelToken,
) -> JoinHandle<Result<Bytes, FetchError>> {
    tokio::task::spawn_blocking(move || {
        run_with_retry(&policy, &cancel, || source.fetch_range(&url, unit.range, &cancel))
    })
}
