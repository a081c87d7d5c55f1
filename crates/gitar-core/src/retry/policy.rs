use std::time::Duration;

/// High-level classification of an error for retry purposes.
///
/// Callers map HTTP status codes, curl errors, listing errors or tool exits
/// into these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (e.g. 429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// HTTP status that is retryable but not strictly throttling (5xx).
    Http5xx(u16),
    /// External tool exited unsuccessfully; another run may succeed.
    ToolFailed,
    /// Any other error (not retried).
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base * 2^(attempt-1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
    /// `unit * attempt^3`, capped at `max`.
    Cubic { unit: Duration, max: Duration },
}

/// Bounded retry: at most `max_attempts` tries (including the first), with
/// `backoff` between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::Exponential {
                base: Duration::from_millis(250),
                max: Duration::from_secs(30),
            },
        }
    }
}

impl RetryPolicy {
    /// Policy for listing API calls; only timeouts are classified retryable.
    pub fn listing(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Exponential {
                base: Duration::from_millis(500),
                max: Duration::from_secs(10),
            },
        }
    }

    /// Policy for the mail step: `min(attempt^3, max)` seconds between tries.
    pub fn notify(max_attempts: u32, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Cubic {
                unit: Duration::from_secs(1),
                max: max_delay,
            },
        }
    }

    /// Delay after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Exponential { base, max } => {
                let exp = 1u32 << attempt.saturating_sub(1).min(16);
                base.saturating_mul(exp).min(max)
            }
            Backoff::Cubic { unit, max } => {
                let n = attempt.saturating_pow(3);
                unit.saturating_mul(n).min(max)
            }
        }
    }

    /// Decide whether to try again after attempt `attempt` (1-based) failed
    /// with an error of `kind`.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::Http5xx(_)
            | ErrorKind::ToolFailed => RetryDecision::RetryAfter(self.delay_after(attempt)),
        }
    }
}
