//! Retry loops: run a closure until success or the policy says stop.

use super::policy::{ErrorKind, RetryDecision, RetryPolicy};
use std::fmt::Display;

/// Runs `f` until it succeeds or `policy` says to stop, sleeping the thread
/// between attempts. `f` receives the 1-based attempt number. The last error
/// is returned when retries stop.
pub fn run_with_retry<T, E, F, C>(policy: &RetryPolicy, classify: C, mut f: F) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    C: Fn(&E) -> ErrorKind,
    E: Display,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => match policy.decide(attempt, classify(&e)) {
                RetryDecision::NoRetry => return Err(e),
                RetryDecision::RetryAfter(d) => {
                    tracing::warn!(attempt, delay = ?d, "retrying after error: {e}");
                    std::thread::sleep(d);
                    attempt += 1;
                }
            },
        }
    }
}

/// Async counterpart of [`run_with_retry`]; waits with `tokio::time::sleep`.
pub async fn run_with_retry_async<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    classify: C,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    C: Fn(&E) -> ErrorKind,
    E: Display,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) => match policy.decide(attempt, classify(&e)) {
                RetryDecision::NoRetry => return Err(e),
                RetryDecision::RetryAfter(d) => {
                    tracing::warn!(attempt, delay = ?d, "retrying after error: {e}");
                    tokio::time::sleep(d).await;
                    attempt += 1;
                }
            },
        }
    }
}
