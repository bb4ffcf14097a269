//! Upstream length probe.
//!
//! Learns the total size of the target with a metadata-only request: `HEAD`
//! first, then `GET` with `Range: bytes=0-0` for servers that refuse `HEAD` or
//! omit `Content-Length` on it. Also captures `Content-Type` and `ETag` so the
//! ranged response can carry them.

mod parse;

pub use parse::{parse_content_range, parse_headers, parse_status_line, ContentRange, UpstreamHeaders};
pub(crate) use parse::collect_header_line;

use crate::source::CurlOptions;

/// What the relay needs to know about the upstream resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub total_length: u64,
    pub content_type: Option<String>,
    pub etag: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("probe request failed: {0}")]
    Transport(#[from] curl::Error),
    #[error("upstream answered HTTP {0}")]
    Http(u32),
    #[error("upstream did not report a content length")]
    MissingLength,
}

/// Probe `url` for its total length. Blocking; call from `spawn_blocking`.
pub fn probe(url: &str, opts: &CurlOptions) -> Result<ProbeResult, ProbeError> {
    match head(url, opts) {
        Ok((code, headers)) if (200..300).contains(&code) => {
            if let Some(total_length) = headers.content_length {
                return Ok(ProbeResult {
                    total_length,
                    content_type: headers.content_type,
                    etag: headers.etag,
                });
            }
            tracing::debug!("HEAD {} has no Content-Length, trying ranged GET", url);
        }
        Ok((code, _)) => tracing::debug!("HEAD {} returned HTTP {}, trying ranged GET", url, code),
        Err(e) => tracing::debug!("HEAD {} failed ({}), trying ranged GET", url, e),
    }

    let (code, headers) = first_byte(url, opts)?;
    let total_length = match code {
        206 => headers.content_range.and_then(|cr| cr.total),
        200 => headers.content_length,
        _ => return Err(ProbeError::Http(code)),
    }
    .ok_or(ProbeError::MissingLength)?;

    Ok(ProbeResult {
        total_length,
        content_type: headers.content_type,
        etag: headers.etag,
    })
}

fn head(url: &str, opts: &CurlOptions) -> Result<(u32, UpstreamHeaders), curl::Error> {
    let mut lines: Vec<String> = Vec::new();
    let mut easy = opts.easy(url)?;
    easy.nobody(true)?;
    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            collect_header_line(&mut lines, data);
            true
        })?;
        transfer.perform()?;
    }
    let code = easy.response_code()?;
    Ok((code, parse_headers(&lines)))
}

/// `GET` with `Range: bytes=0-0`. The body is discarded; if upstream ignores
/// the range the transfer is cut off at the first body chunk.
fn first_byte(url: &str, opts: &CurlOptions) -> Result<(u32, UpstreamHeaders), curl::Error> {
    let mut lines: Vec<String> = Vec::new();
    let mut easy = opts.easy(url)?;
    easy.range("0-0")?;
    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            collect_header_line(&mut lines, data);
            true
        })?;
        transfer.write_function(|_data| Ok(0))?;
        transfer.perform()
    };
    match performed {
        Ok(()) => {}
        // Aborted on purpose by the write callback once headers are in.
        Err(e) if e.is_write_error() => {}
        Err(e) => return Err(e),
    }
    let code = easy.response_code()?;
    Ok((code, parse_headers(&lines)))
}
