#![allow(dead_code)]

pub mod range_server;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use vfunnel_core::config::FunnelConfig;
use vfunnel_core::server::{self, AppState};

/// Deterministic, non-repeating-looking payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 7919) % 253) as u8).collect()
}

pub fn encode_link(url: &str) -> String {
    use base64::engine::general_purpose::URL_SAFE;
    use base64::Engine as _;
    URL_SAFE.encode(url)
}

/// Starts the proxy on an ephemeral port with a libcurl upstream.
pub async fn start_proxy(cfg: FunnelConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind proxy");
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(AppState::from_config(&cfg));
    tokio::spawn(server::serve(listener, state, std::future::pending()));
    addr
}

pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// One HTTP/1.1 request with `Connection: close`, read to EOF.
/// Only meant for responses with a Content-Length.
pub async fn request(addr: SocketAddr, method: &str, path: &str, range: Option<&str>) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.expect("connect proxy");
    let mut req = format!("{} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n", method, path, addr);
    if let Some(r) = range {
        req.push_str(&format!("Range: {}\r\n", r));
    }
    req.push_str("\r\n");
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    // An aborted body surfaces as a short read or a reset; keep what arrived.
    let _ = stream.read_to_end(&mut raw).await;

    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response head");
    let head = String::from_utf8_lossy(&raw[..split]).to_string();
    let body = raw[split + 4..].to_vec();
    let mut lines = head.lines();
    let status = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .and_then(|s| s.parse().ok())
        .expect("status line");
    let headers = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    RawResponse { status, headers, body }
}
