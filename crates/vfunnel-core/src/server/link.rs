//! Decoding of the `link` query parameter into the upstream URL.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("missing `link` query parameter")]
    Missing,
    #[error("`link` is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("`link` does not decode to UTF-8 text")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("`link` is not a valid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("unsupported URL scheme {0:?}")]
    Scheme(String),
}

/// Extracts and decodes `link` from a raw query string.
pub fn target_from_query(query: Option<&str>) -> Result<String, LinkError> {
    let encoded = url::form_urlencoded::parse(query.unwrap_or("").as_bytes())
        .find(|(k, _)| k == "link")
        .map(|(_, v)| v.into_owned())
        .ok_or(LinkError::Missing)?;
    decode_link(&encoded)
}

/// Decodes a base64 (standard or URL-safe, padding optional) http(s) URL.
/// The URL is returned as sent, only validated.
pub fn decode_link(encoded: &str) -> Result<String, LinkError> {
    // Form decoding turns an unescaped '+' into a space, so spaces are
    // restored before any trimming; only line breaks and tabs are stripped.
    let restored = encoded.replace(' ', "+");
    let cleaned = restored.trim_matches(['\r', '\n', '\t']);
    let unpadded = cleaned.trim_end_matches('=');
    let bytes = if unpadded.contains(['-', '_']) {
        URL_SAFE_NO_PAD.decode(unpadded)?
    } else {
        STANDARD_NO_PAD.decode(unpadded)?
    };
    let text = String::from_utf8(bytes)?;
    let target = text.trim();
    let url = Url::parse(target)?;
    match url.scheme() {
        "http" | "https" => Ok(target.to_string()),
        other => Err(LinkError::Scheme(other.to_string())),
    }
}
