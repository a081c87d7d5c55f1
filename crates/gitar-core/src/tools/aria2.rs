//! `aria2c` archive fetcher.

use super::{locate, run_status, Fetcher, ToolError};
use std::path::Path;
use std::process::Command;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0";

#[derive(Debug, Clone)]
pub struct Aria2Fetcher {
    program: String,
    max_tries: u32,
}

impl Aria2Fetcher {
    pub fn new(max_tries: u32) -> Self {
        Self {
            program: "aria2c".to_string(),
            max_tries: max_tries.max(1),
        }
    }

    fn args(&self, url: &str, dir: &Path, file_name: &str) -> Vec<String> {
        vec![
            format!("--dir={}", dir.display()),
            format!("--out={file_name}"),
            format!("--max-tries={}", self.max_tries),
            "--lowest-speed-limit=1".to_string(),
            format!("--user-agent={USER_AGENT}"),
            "--file-allocation=none".to_string(),
            url.to_string(),
        ]
    }
}

impl Fetcher for Aria2Fetcher {
    fn fetch(&self, url: &str, dir: &Path, file_name: &str) -> Result<(), ToolError> {
        let bin = locate(&self.program)?;
        run_status(
            &self.program,
            Command::new(bin).args(self.args(url, dir, file_name)),
        )
    }
}
