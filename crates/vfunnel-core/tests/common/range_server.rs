//! Minimal HTTP/1.1 upstream that supports HEAD and Range GET.
//!
//! Serves a single static body with a fixed content type and ETag. One request
//! per connection.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const CONTENT_TYPE: &str = "video/mp4";
pub const ETAG: &str = "\"upstream-1\"";

#[derive(Debug, Clone, Default)]
pub struct RangeServerOptions {
    /// HEAD answers 405 (servers that block HEAD).
    pub head_blocked: bool,
    /// GET ignores Range and always returns 200 with the full body.
    pub ignore_ranges: bool,
    /// Range GETs starting at these offsets answer 500.
    pub failing_starts: HashSet<u64>,
}

/// Starts a server thread serving `body`. Returns the URL of the resource.
/// The server runs until the process exits.
pub fn start(body: Vec<u8>) -> String {
    start_with_options(body, RangeServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let opts = Arc::new(opts);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let opts = Arc::clone(&opts);
            thread::spawn(move || handle(stream, &body, &opts));
        }
    });
    format!("http://127.0.0.1:{}/media/clip.mp4", port)
}

fn handle(mut stream: std::net::TcpStream, body: &[u8], opts: &RangeServerOptions) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, range) = parse_request(request);
    let total = body.len() as u64;
    let common = format!(
        "Content-Type: {}\r\nETag: {}\r\nConnection: close\r\n",
        CONTENT_TYPE, ETAG
    );
    let accept = if opts.ignore_ranges { "" } else { "Accept-Ranges: bytes\r\n" };

    if method.eq_ignore_ascii_case("HEAD") {
        if opts.head_blocked {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            return;
        }
        let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}{}\r\n", total, accept, common);
        let _ = stream.write_all(head.as_bytes());
        return;
    }
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }

    let range = if opts.ignore_ranges { None } else { range };
    let Some((start, end_incl)) = range else {
        let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}{}\r\n", total, accept, common);
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(body);
        return;
    };
    if opts.failing_starts.contains(&start) {
        let _ = stream.write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }
    let end_incl = end_incl.min(total.saturating_sub(1));
    if total == 0 || start > end_incl {
        let head = format!(
            "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\n{}\r\n",
            total, common
        );
        let _ = stream.write_all(head.as_bytes());
        return;
    }
    let slice = &body[start as usize..=end_incl as usize];
    let head = format!(
        "HTTP/1.1 206 Partial Content\r\nContent-Length: {}\r\nContent-Range: bytes {}-{}/{}\r\n{}{}\r\n",
        slice.len(),
        start,
        end_incl,
        total,
        accept,
        common
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(slice);
}

/// Returns (method, optional (start, end_inclusive) for `Range: bytes=X-Y`).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                if let Some(part) = value.trim().strip_prefix("bytes=") {
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, range)
}
