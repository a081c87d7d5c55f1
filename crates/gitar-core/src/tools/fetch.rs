//! In-process archive fetcher over libcurl.

use super::{Fetcher, ToolError};
use crate::retry::{run_with_retry, RetryPolicy};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CurlFetcher {
    retry: RetryPolicy,
    connect_timeout: Duration,
}

impl CurlFetcher {
    pub fn new(max_tries: u32) -> Self {
        Self {
            retry: RetryPolicy {
                max_attempts: max_tries.max(1),
                ..RetryPolicy::default()
            },
            connect_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn fetch_once(&self, url: &str, dest: &Path) -> Result<(), ToolError> {
        let curl_err = |source| ToolError::Curl {
            url: url.to_string(),
            source,
        };
        let mut out =
            File::create(dest).map_err(|e| ToolError::io(format!("create {}", dest.display()), e))?;
        let mut write_err = None;

        let mut easy = curl::easy::Easy::new();
        easy.url(url).map_err(curl_err)?;
        easy.follow_location(true).map_err(curl_err)?;
        easy.connect_timeout(self.connect_timeout).map_err(curl_err)?;
        easy.useragent(super::aria2::USER_AGENT).map_err(curl_err)?;
        // Abort transfers that stall below 1 B/s for a minute.
        easy.low_speed_limit(1).map_err(curl_err)?;
        easy.low_speed_time(Duration::from_secs(60)).map_err(curl_err)?;
        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| match out.write_all(data) {
                    Ok(()) => Ok(data.len()),
                    Err(e) => {
                        write_err = Some(e);
                        // Short count makes curl abort with a write error.
                        Ok(0)
                    }
                })
                .map_err(curl_err)?;
            let performed = transfer.perform();
            drop(transfer);
            if let Some(e) = write_err.take() {
                return Err(ToolError::io(format!("write {}", dest.display()), e));
            }
            performed.map_err(curl_err)?;
        }

        let status = easy.response_code().map_err(curl_err)?;
        if !(200..300).contains(&status) {
            return Err(ToolError::Http {
                url: url.to_string(),
                status,
            });
        }
        out.flush()
            .map_err(|e| ToolError::io(format!("flush {}", dest.display()), e))
    }
}

impl Fetcher for CurlFetcher {
    fn fetch(&self, url: &str, dir: &Path, file_name: &str) -> Result<(), ToolError> {
        let dest = dir.join(file_name);
        run_with_retry(&self.retry, ToolError::retry_kind, |attempt| {
            tracing::debug!(attempt, url, "fetching archive");
            self.fetch_once(url, &dest)
        })
    }
}
