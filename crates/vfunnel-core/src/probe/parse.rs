//! Parse HTTP response header lines collected from libcurl.

/// `Content-Range: bytes start-end/total` (total may be `*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub total: Option<u64>,
}

/// Headers of the final response (after redirects) that the relay cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamHeaders {
    /// Status code from the last `HTTP/` status line.
    pub status: Option<u32>,
    pub content_length: Option<u64>,
    pub content_range: Option<ContentRange>,
    pub content_type: Option<String>,
    /// Raw `ETag` value, quotes kept so it can be mirrored verbatim.
    pub etag: Option<String>,
    /// True if upstream sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
}

/// Append one raw header line from curl's header callback. A new status line
/// starts a new response (redirect hop), so earlier lines are dropped.
pub(crate) fn collect_header_line(lines: &mut Vec<String>, data: &[u8]) {
    if let Ok(s) = std::str::from_utf8(data) {
        let line = s.trim_end();
        if line.starts_with("HTTP/") {
            lines.clear();
        }
        lines.push(line.to_string());
    }
}

/// Parse collected header lines into `UpstreamHeaders`.
pub fn parse_headers(lines: &[String]) -> UpstreamHeaders {
    let mut out = UpstreamHeaders::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            out = UpstreamHeaders {
                status: parse_status_line(line),
                ..UpstreamHeaders::default()
            };
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            out.content_length = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("content-range") {
            out.content_range = parse_content_range(value);
        } else if name.eq_ignore_ascii_case("content-type") {
            out.content_type = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("etag") {
            out.etag = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            out.accept_ranges = value.eq_ignore_ascii_case("bytes");
        }
    }

    out
}

/// Status code from `HTTP/1.1 206 Partial Content` or `HTTP/2 200`.
pub fn parse_status_line(line: &str) -> Option<u32> {
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Parse a `Content-Range` value such as `bytes 0-99/1000` or `bytes 0-99/*`.
pub fn parse_content_range(value: &str) -> Option<ContentRange> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (span, total) = rest.split_once('/')?;
    let (start, end) = span.trim().split_once('-')?;
    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse().ok()?),
    };
    Some(ContentRange {
        start: start.trim().parse().ok()?,
        end: end.trim().parse().ok()?,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_headers_content_length_and_ranges() {
        let h = parse_headers(&lines(&[
            "HTTP/1.1 200 OK",
            "Content-Length: 12345",
            "Accept-Ranges: bytes",
            "Content-Type: video/mp4",
        ]));
        assert_eq!(h.status, Some(200));
        assert_eq!(h.content_length, Some(12345));
        assert!(h.accept_ranges);
        assert_eq!(h.content_type.as_deref(), Some("video/mp4"));
        assert!(h.etag.is_none());
    }

    #[test]
    fn parse_headers_keeps_etag_quotes() {
        let h = parse_headers(&lines(&["ETag: \"abc-123\""]));
        assert_eq!(h.etag.as_deref(), Some("\"abc-123\""));
    }

    #[test]
    fn parse_headers_uses_last_response_after_redirect() {
        let h = parse_headers(&lines(&[
            "HTTP/1.1 302 Found",
            "Location: http://cdn/",
            "Content-Length: 0",
            "",
            "HTTP/1.1 206 Partial Content",
            "Content-Range: bytes 0-0/5000",
        ]));
        assert_eq!(h.status, Some(206));
        assert_eq!(h.content_length, None);
        assert_eq!(
            h.content_range,
            Some(ContentRange {
                start: 0,
                end: 0,
                total: Some(5000)
            })
        );
    }

    #[test]
    fn parse_headers_ignores_bad_length() {
        let h = parse_headers(&lines(&["Content-Length: lots"]));
        assert_eq!(h.content_length, None);
    }

    #[test]
    fn content_range_forms() {
        assert_eq!(
            parse_content_range("bytes 100-199/1000"),
            Some(ContentRange {
                start: 100,
                end: 199,
                total: Some(1000)
            })
        );
        assert_eq!(parse_content_range("bytes 0-9/*").unwrap().total, None);
        assert!(parse_content_range("bytes */1000").is_none());
        assert!(parse_content_range("items 0-9/10").is_none());
    }

    #[test]
    fn collect_resets_on_status_line() {
        let mut v = Vec::new();
        collect_header_line(&mut v, b"HTTP/1.1 302 Found\r\n");
        collect_header_line(&mut v, b"Location: http://other/\r\n");
        assert_eq!(v.len(), 2);
        collect_header_line(&mut v, b"HTTP/1.1 206 Partial Content\r\n");
        assert_eq!(v.len(), 1);
        assert!(v[0].contains("206"));
    }

    #[test]
    fn status_line_http2() {
        assert_eq!(parse_status_line("HTTP/2 404"), Some(404));
        assert_eq!(parse_status_line("HTTP/1.1"), None);
    }
}
