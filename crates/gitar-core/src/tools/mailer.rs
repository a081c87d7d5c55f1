//! Mail notifier: `<program> send --profile=<profile> --subject <subject> <file>`.

use super::{locate, run_status, Notifier, ToolError};
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
    profile: String,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            profile: profile.into(),
        }
    }

    fn args(&self, file: &Path, subject: &str) -> Vec<String> {
        vec![
            "send".to_string(),
            format!("--profile={}", self.profile),
            "--subject".to_string(),
            subject.to_string(),
            file.display().to_string(),
        ]
    }
}

impl Notifier for CommandNotifier {
    fn send(&self, file: &Path, subject: &str) -> Result<(), ToolError> {
        let bin = locate(&self.program)?;
        run_status(&self.program, Command::new(bin).args(self.args(file, subject)))
    }
}
