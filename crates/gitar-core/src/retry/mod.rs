//! Retry and backoff policy.
//!
//! Error classification (timeouts, throttling, connection failures, failed
//! external tools) and backoff decisions shared by the listing client, the
//! in-process fetcher and the notification step.

mod classify;
mod policy;
mod run;

pub use classify::{classify_curl_error, classify_http_status};
pub use policy::{Backoff, ErrorKind, RetryDecision, RetryPolicy};
pub use run::{run_with_retry, run_with_retry_async};
