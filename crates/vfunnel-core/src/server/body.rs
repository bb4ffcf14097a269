//! Response body plumbing and small response builders.

use bytes::Bytes;
use futures::stream;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full, StreamBody};
use hyper::body::Frame;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::http::response::Builder;
use hyper::{Response, StatusCode};
use std::io;

use crate::relay::BodyReceiver;

/// Body type of every response the proxy produces.
pub type ProxyBody = BoxBody<Bytes, io::Error>;

pub fn empty() -> ProxyBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

pub fn full(data: impl Into<Bytes>) -> ProxyBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

/// Body fed by a relay sink, optionally starting with a chunk already
/// taken off the channel. An `Err` item aborts the response.
pub fn streamed(first: Option<Bytes>, rx: BodyReceiver) -> ProxyBody {
    let frames = stream::unfold((first, rx), |(first, mut rx)| async move {
        if let Some(data) = first {
            return Some((Ok(Frame::data(data)), (None, rx)));
        }
        rx.recv().await.map(|item| (item.map(Frame::data), (None, rx)))
    });
    BoxBody::new(StreamBody::new(frames))
}

/// Plain-text response for errors and trivial endpoints.
pub fn text(status: StatusCode, message: &str) -> Response<ProxyBody> {
    let mut resp = Response::new(full(format!("{}\n", message)));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    resp
}

/// Copies an upstream header value if it is present and valid on the wire.
pub fn mirror(builder: Builder, name: hyper::header::HeaderName, value: Option<&str>) -> Builder {
    match value.and_then(|v| HeaderValue::from_str(v).ok()) {
        Some(v) => builder.header(name, v),
        None => builder,
    }
}

/// Finishes a builder; header errors become a 500 instead of a panic.
pub fn finish(builder: Builder, body: ProxyBody) -> Response<ProxyBody> {
    builder.body(body).unwrap_or_else(|e| {
        tracing::error!("failed to build response: {}", e);
        text(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    })
}
