//! Retry loop: run a blocking fetch until success, cancellation, or the policy says stop.

use super::classify;
use super::error::FetchError;
use super::policy::{RetryDecision, RetryPolicy};
use crate::control::CancelToken;

/// Runs `f` until it succeeds or the retry policy says to stop. Backoff sleeps
/// wake early and give up when `cancel` is set.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, cancel: &CancelToken, mut f: F) -> Result<T, FetchError>
where
    F: FnMut() -> Result<T, FetchError>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                if cancel.is_cancelled() {
                    return Err(FetchError::Cancelled);
                }
                match policy.decide(attempt, classify::classify(&e)) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!("attempt {} failed ({}), retrying in {:?}", attempt, e, d);
                        if !cancel.sleep(d) {
                            return Err(FetchError::Cancelled);
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }
}
