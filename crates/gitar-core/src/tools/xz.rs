//! gzip -> xz conversion: gzip is decoded in-process, `xz -c -` re-encodes.

use super::{locate, Recompressor, ToolError};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

#[derive(Debug, Clone)]
pub struct XzRecompressor {
    program: String,
    args: Vec<String>,
}

impl Default for XzRecompressor {
    fn default() -> Self {
        Self::new("xz")
    }
}

impl XzRecompressor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["-c".to_string(), "-".to_string()],
        }
    }

    /// Replace the default `-c -` arguments (program must read stdin, write stdout).
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Recompressor for XzRecompressor {
    fn gzip_to_xz(&self, src: &Path, dst: &Path) -> Result<(), ToolError> {
        let bin = locate(&self.program)?;
        let input = File::open(src).map_err(|e| ToolError::io(format!("open {}", src.display()), e))?;
        let output =
            File::create(dst).map_err(|e| ToolError::io(format!("create {}", dst.display()), e))?;

        let mut child = Command::new(bin)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::from(output))
            .spawn()
            .map_err(|source| ToolError::Spawn {
                tool: self.program.clone(),
                source,
            })?;

        // stdout goes straight to the file, so feeding stdin from this thread cannot deadlock.
        let copied = match child.stdin.take() {
            Some(mut stdin) => io::copy(&mut GzDecoder::new(input), &mut stdin).map(|_| ()),
            None => Ok(()),
        };
        let status = child.wait().map_err(|source| ToolError::Spawn {
            tool: self.program.clone(),
            source,
        })?;
        copied.map_err(|e| ToolError::io(format!("decode gzip {}", src.display()), e))?;
        if !status.success() {
            return Err(ToolError::Failed {
                tool: self.program.clone(),
                status,
            });
        }
        Ok(())
    }
}
