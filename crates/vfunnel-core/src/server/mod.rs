//! HTTP front end: accept loop, routing and graceful stop.

mod body;
mod index;
pub mod link;
mod proxy;

pub use body::ProxyBody;
pub use link::{decode_link, LinkError};
pub use proxy::ProxyRequest;

use anyhow::{Context, Result};
use hyper::header::{HeaderValue, ALLOW, RANGE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::FunnelConfig;
use crate::relay::RelayConfig;
use crate::source::{CurlOptions, CurlSource, RangeSource};

/// How long a stopping server waits for open connections.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared by every connection: the upstream and the relay settings.
pub struct AppState {
    pub source: Arc<dyn RangeSource>,
    pub relay: RelayConfig,
}

impl AppState {
    pub fn new(source: Arc<dyn RangeSource>, relay: RelayConfig) -> Self {
        Self { source, relay }
    }

    /// libcurl-backed state built from the loaded configuration.
    pub fn from_config(cfg: &FunnelConfig) -> Self {
        Self::new(
            Arc::new(CurlSource::new(CurlOptions::from(cfg))),
            RelayConfig::from(cfg),
        )
    }
}

/// Binds `cfg.listen_addr` and serves until Ctrl-C.
pub async fn run(cfg: &FunnelConfig) -> Result<()> {
    cfg.validate()?;
    let listener = TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;
    info!(
        "vfunnel listening on {} (pool_size={}, block_size={})",
        listener.local_addr()?,
        cfg.pool_size,
        cfg.block_size
    );
    serve(listener, Arc::new(AppState::from_config(cfg)), shutdown_signal()).await
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Accepts connections on `listener` until `shutdown` resolves, then waits
/// briefly for open connections to finish.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let active = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    debug!("connection from {}", addr);
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("failed to set TCP_NODELAY for {}: {}", addr, e);
                    }
                    let state = Arc::clone(&state);
                    let active = Arc::clone(&active);
                    active.fetch_add(1, Ordering::Relaxed);
                    tokio::spawn(async move {
                        serve_connection(stream, addr, state).await;
                        active.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                Err(e) => error!("failed to accept connection: {}", e),
            },
            _ = &mut shutdown => {
                info!("shutdown requested, no longer accepting connections");
                break;
            }
        }
    }

    let started = tokio::time::Instant::now();
    while active.load(Ordering::Relaxed) > 0 && started.elapsed() < DRAIN_TIMEOUT {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let remaining = active.load(Ordering::Relaxed);
    if remaining > 0 {
        warn!("stopping with {} connections still open", remaining);
    }
    info!("server stopped");
    Ok(())
}

async fn serve_connection(stream: TcpStream, addr: SocketAddr, state: Arc<AppState>) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| {
        let state = Arc::clone(&state);
        async move { Ok::<_, Infallible>(route(state, req).await) }
    });

    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
        // Aborted bodies and vanished clients are routine for a media relay.
        if err.is_user()
            || err.is_canceled()
            || err.is_closed()
            || err.is_incomplete_message()
            || err.is_body_write_aborted()
        {
            debug!("connection from {} ended: {}", addr, err);
        } else {
            error!("error serving connection from {}: {}", addr, err);
        }
    }
}

/// Dispatches one request. The request body is never read.
pub async fn route<B>(state: Arc<AppState>, req: Request<B>) -> Response<ProxyBody> {
    let is_head = req.method() == Method::HEAD;
    if req.method() != Method::GET && !is_head {
        let mut resp = body::text(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
        resp.headers_mut()
            .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
        return resp;
    }

    let path = req.uri().path().to_owned();
    match path.as_str() {
        "/proxy" => {
            let proxy_req = ProxyRequest {
                query: req.uri().query().map(str::to_owned),
                range: req
                    .headers()
                    .get(RANGE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned),
                is_head,
            };
            proxy::handle(state, proxy_req).await
        }
        "/" | "/index.html" => index::page(is_head),
        "/healthz" => body::text(StatusCode::OK, "ok"),
        other => {
            debug!("no route for {}", other);
            body::text(StatusCode::NOT_FOUND, "not found")
        }
    }
}
