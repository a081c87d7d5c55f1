//! Mail step with bounded cubic backoff.

use crate::retry::{run_with_retry_async, RetryPolicy};
use crate::tools::{Notifier, ToolError};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("send failed after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: ToolError,
    },
}

/// Send `file` until the notifier succeeds or `policy` gives up.
/// Returns the number of attempts used.
pub(crate) async fn send_with_retry(
    notifier: Arc<dyn Notifier>,
    policy: &RetryPolicy,
    file: PathBuf,
    subject: String,
) -> Result<u32, NotifyError> {
    let mut last_attempt = 0;
    let sent = run_with_retry_async(policy, ToolError::retry_kind, |attempt| {
        last_attempt = attempt;
        let notifier = Arc::clone(&notifier);
        let file = file.clone();
        let subject = subject.clone();
        async move {
            tracing::info!(attempt, subject = %subject, "sending archive");
            match tokio::task::spawn_blocking(move || notifier.send(&file, &subject)).await {
                Ok(res) => res,
                Err(e) => Err(ToolError::io("notifier task", io::Error::other(e))),
            }
        }
    })
    .await;

    match sent {
        Ok(()) => Ok(last_attempt),
        Err(source) => Err(NotifyError::Exhausted {
            attempts: last_attempt,
            source,
        }),
    }
}
