//! Upstream transfers over libcurl.
//!
//! `fetch_range` reads one block fully into memory and validates status,
//! `Content-Range` and length before handing it back. `stream_full` relays
//! a whole resource for requests without a `Range` header.

mod block;
mod passthrough;

pub use block::fetch_range;
pub use passthrough::stream_full;
