//! Per-request cancellation.
//!
//! Every ranged relay owns one `CancelToken`. Fetch workers run as blocking
//! libcurl transfers and poll the token from their progress callback, so
//! setting it aborts every in-flight transfer of that request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity of `CancelToken::sleep` checks.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Shared abort flag for all fetches belonging to one client request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Blocking sleep that wakes early on cancellation.
    /// Returns `false` if the token was cancelled before `total` elapsed.
    pub fn sleep(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

/// Cancels the token when dropped, so a relay future that is dropped mid-flight
/// (client went away, runtime shutdown) still stops its workers.
pub struct CancelOnDrop(pub CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}
