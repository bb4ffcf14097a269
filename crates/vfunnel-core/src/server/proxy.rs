//! `/proxy` handler: ranged relay or whole-resource passthrough.

use hyper::header::{
    ACCEPT_RANGES, CONNECTION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG,
};
use hyper::{Response, StatusCode};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::body::{empty, finish, mirror, streamed, text, ProxyBody};
use super::link;
use super::AppState;
use crate::probe::ProbeResult;
use crate::range::RangeRequest;
use crate::relay::{body_channel, relay_span, RelayError};
use crate::retry::FetchError;

/// Chunks buffered between the passthrough worker and the client.
const PASSTHROUGH_DEPTH: usize = 16;

/// The parts of an incoming request the proxy looks at.
#[derive(Debug, Clone, Default)]
pub struct ProxyRequest {
    pub query: Option<String>,
    pub range: Option<String>,
    pub is_head: bool,
}

pub async fn handle(state: Arc<AppState>, req: ProxyRequest) -> Response<ProxyBody> {
    let url: Arc<str> = match link::target_from_query(req.query.as_deref()) {
        Ok(url) => url.into(),
        Err(e) => {
            warn!("rejecting proxy request: {}", e);
            return text(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    match req.range.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
        Some(header) => {
            info!("ranged request for {} ({})", url, header);
            ranged(state, url, RangeRequest::parse(header), req.is_head).await
        }
        None => {
            info!("passthrough request for {}", url);
            passthrough(state, url, req.is_head).await
        }
    }
}

async fn probe(state: &AppState, url: &Arc<str>) -> Result<ProbeResult, String> {
    let source = Arc::clone(&state.source);
    let target = Arc::clone(url);
    match tokio::task::spawn_blocking(move || source.probe(&target)).await {
        Ok(Ok(probe)) => Ok(probe),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("probe worker failed: {}", e)),
    }
}

fn bad_gateway(url: &str, reason: &str) -> Response<ProxyBody> {
    warn!("upstream {} failed: {}", url, reason);
    text(StatusCode::BAD_GATEWAY, &format!("upstream request failed: {}", reason))
}

async fn ranged(
    state: Arc<AppState>,
    url: Arc<str>,
    request: RangeRequest,
    is_head: bool,
) -> Response<ProxyBody> {
    let meta = match probe(&state, &url).await {
        Ok(meta) => meta,
        Err(reason) => return bad_gateway(&url, &reason),
    };
    let total = meta.total_length;

    let span = match request.resolve(total) {
        Ok(span) => span,
        Err(e) => {
            debug!("{} for {}", e, url);
            let builder = Response::builder()
                .status(StatusCode::RANGE_NOT_SATISFIABLE)
                .header(CONTENT_RANGE, format!("bytes */{}", total))
                .header(CONTENT_LENGTH, 0u64);
            return finish(builder, empty());
        }
    };

    let builder = Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(CONTENT_LENGTH, span.len())
        .header(CONTENT_RANGE, span.content_range_value(total))
        .header(ACCEPT_RANGES, "bytes")
        .header(CONNECTION, "keep-alive");
    let builder = mirror(builder, CONTENT_TYPE, meta.content_type.as_deref());
    let builder = mirror(builder, ETAG, meta.etag.as_deref());

    if is_head {
        return finish(builder, empty());
    }

    let (sink, mut rx) = body_channel(state.relay.pool_size);
    let source = Arc::clone(&state.source);
    let relay = state.relay;
    let target = Arc::clone(&url);
    tokio::spawn(async move {
        match relay_span(source, Arc::clone(&target), span, &relay, &sink).await {
            Ok(n) => info!("relayed {} bytes ({}) of {}", n, span, target),
            Err(RelayError::ClientGone { delivered }) => {
                debug!("client left {} after {} bytes", target, delivered)
            }
            Err(e) => {
                warn!("aborting response for {}: {}", target, e);
                sink.fail(e.to_string()).await;
            }
        }
    });

    // The head is only committed once the first block is in hand, so an
    // early upstream failure can still be reported as a 502.
    match rx.recv().await {
        Some(Ok(first)) => finish(builder, streamed(Some(first), rx)),
        Some(Err(e)) => bad_gateway(&url, &e.to_string()),
        None => bad_gateway(&url, "relay ended before the first block"),
    }
}

async fn passthrough(state: Arc<AppState>, url: Arc<str>, is_head: bool) -> Response<ProxyBody> {
    if is_head {
        let meta = match probe(&state, &url).await {
            Ok(meta) => meta,
            Err(reason) => return bad_gateway(&url, &reason),
        };
        let builder = Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_LENGTH, meta.total_length)
            .header(ACCEPT_RANGES, "bytes")
            .header(CONNECTION, "keep-alive");
        let builder = mirror(builder, CONTENT_TYPE, meta.content_type.as_deref());
        let builder = mirror(builder, ETAG, meta.etag.as_deref());
        return finish(builder, empty());
    }

    let (sink, rx) = body_channel(PASSTHROUGH_DEPTH);
    let (head_tx, head_rx) = oneshot::channel();
    let source = Arc::clone(&state.source);
    let target = Arc::clone(&url);
    let worker_sink = sink.clone();
    let worker = tokio::task::spawn_blocking(move || source.stream_full(&target, head_tx, &worker_sink));

    let head = match head_rx.await {
        Ok(head) => head,
        Err(_) => {
            let reason = match worker.await {
                Ok(Err(e)) => e.to_string(),
                Ok(Ok(_)) => "upstream sent no response".to_string(),
                Err(e) => format!("passthrough worker failed: {}", e),
            };
            return bad_gateway(&url, &reason);
        }
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(ACCEPT_RANGES, "bytes")
        .header(CONNECTION, "keep-alive");
    if let Some(len) = head.content_length {
        builder = builder.header(CONTENT_LENGTH, len);
    }
    let builder = mirror(builder, CONTENT_TYPE, head.content_type.as_deref());
    let builder = mirror(builder, ETAG, head.etag.as_deref());
    let response = finish(builder, streamed(None, rx));

    tokio::spawn(async move {
        match worker.await {
            Ok(Ok(n)) => info!("passed through {} bytes of {}", n, url),
            Ok(Err(FetchError::Cancelled)) => debug!("client left passthrough of {}", url),
            Ok(Err(e)) => {
                warn!("aborting passthrough of {}: {}", url, e);
                sink.fail(e.to_string()).await;
            }
            Err(e) => {
                warn!("passthrough worker for {} failed: {}", url, e);
                sink.fail(e.to_string()).await;
            }
        }
    });
    response
}
