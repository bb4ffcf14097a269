//! Single-block HTTP Range GET into memory.

use bytes::Bytes;
use curl::easy::{Handler, WriteError};

use crate::control::CancelToken;
use crate::probe::{collect_header_line, parse_headers};
use crate::range::ByteRange;
use crate::retry::FetchError;
use crate::source::CurlOptions;

/// Outcome of inspecting the response head on the first body write.
#[derive(Debug)]
enum Verdict {
    Accept,
    Reject(FetchError),
}

/// Easy2 handler for one block. Checks the response head before buffering
/// any data and never buffers more than the block length.
pub(super) struct BlockHandler {
    range: ByteRange,
    cancel: CancelToken,
    response_headers: Vec<String>,
    /// None = head not yet checked.
    verdict: Option<Verdict>,
    body: Vec<u8>,
    /// Bytes offered by curl, including any past the block end.
    received: u64,
    /// More data arrived than the block holds; transfer was cut off.
    overflow: bool,
}

impl BlockHandler {
    pub(super) fn new(range: ByteRange, cancel: CancelToken) -> Self {
        Self {
            range,
            cancel,
            response_headers: Vec::new(),
            verdict: None,
            body: Vec::with_capacity(range.len() as usize),
            received: 0,
            overflow: false,
        }
    }

    fn check_head(&self) -> Verdict {
        let headers = parse_headers(&self.response_headers);
        match headers.status {
            Some(206) => match headers.content_range {
                Some(cr) if cr.start == self.range.start && cr.end == self.range.end => Verdict::Accept,
                Some(cr) => Verdict::Reject(FetchError::RangeMismatch {
                    want: self.range.to_string(),
                    got: format!("{}-{}", cr.start, cr.end),
                }),
                // Length is still checked after the transfer.
                None => Verdict::Accept,
            },
            // Range ignored: the body starts at offset 0, usable only for a block at 0.
            Some(200) if self.range.start == 0 => Verdict::Accept,
            Some(200) => Verdict::Reject(FetchError::RangeIgnored {
                start: self.range.start,
            }),
            Some(code) => Verdict::Reject(FetchError::Http(code)),
            None => Verdict::Reject(FetchError::Http(0)),
        }
    }
}

impl Handler for BlockHandler {
    fn header(&mut self, data: &[u8]) -> bool {
        collect_header_line(&mut self.response_headers, data);
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if self.verdict.is_none() {
            self.verdict = Some(self.check_head());
        }
        if !matches!(self.verdict, Some(Verdict::Accept)) {
            return Ok(0);
        }
        self.received += data.len() as u64;
        let room = (self.range.len() - self.body.len() as u64) as usize;
        if data.len() > room {
            self.body.extend_from_slice(&data[..room]);
            self.overflow = true;
            return Ok(0);
        }
        self.body.extend_from_slice(data);
        Ok(data.len())
    }

    fn progress(&mut self, _dltotal: f64, _dlnow: f64, _ultotal: f64, _ulnow: f64) -> bool {
        !self.cancel.is_cancelled()
    }
}

/// Fetches `range` of `url`. Blocking; runs on a worker thread.
///
/// Returns exactly `range.len()` bytes or an error; a short, long, or
/// misplaced body is never passed off as the block.
pub fn fetch_range(
    url: &str,
    range: ByteRange,
    opts: &CurlOptions,
    cancel: &CancelToken,
) -> Result<Bytes, FetchError> {
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }
    let mut easy = opts.block_easy(url, BlockHandler::new(range, cancel.clone()))?;
    easy.range(&range.to_string())?;

    let performed = easy.perform();
    let code = easy.response_code()?;
    let handler = easy.get_mut();

    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }
    if let Some(Verdict::Reject(e)) = handler.verdict.take() {
        return Err(e);
    }
    let expected = range.len();
    match performed {
        Ok(()) => {}
        // Cut off on purpose: a 200 for a block at 0 is the resource prefix.
        Err(e) if e.is_write_error() && handler.overflow => {
            if code != 200 {
                return Err(FetchError::PartialTransfer {
                    expected,
                    received: handler.received,
                });
            }
        }
        Err(e) => return Err(FetchError::Transport(e)),
    }
    if code != 200 && code != 206 {
        return Err(FetchError::Http(code));
    }
    let received = handler.body.len() as u64;
    if received != expected {
        return Err(FetchError::PartialTransfer { expected, received });
    }
    Ok(Bytes::from(std::mem::take(&mut handler.body)))
}
