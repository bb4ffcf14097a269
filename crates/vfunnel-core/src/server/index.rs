//! Embedded landing page: paste a link, play it through `/proxy`.

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};

use super::body::{empty, full, ProxyBody};

const INDEX_HTML: &str = include_str!("../../static/index.html");

pub fn page(is_head: bool) -> Response<ProxyBody> {
    let body = if is_head { empty() } else { full(INDEX_HTML) };
    let mut resp = Response::new(body);
    *resp.status_mut() = StatusCode::OK;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    resp
}
