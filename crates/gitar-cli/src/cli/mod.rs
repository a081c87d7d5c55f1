//! CLI for gitar, the git archive downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gitar_core::config::{self, GitarConfig};
use gitar_core::logging;
use std::path::PathBuf;

use commands::{run_download, run_resolve};

/// Top-level CLI for gitar.
#[derive(Debug, Parser)]
#[command(name = "gitar")]
#[command(about = "gitar: fetch GitHub/Gitee archives pinned to a commit", long_about = None)]
pub struct Cli {
    /// Config file to use instead of the search path.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Resolve a repository URL and store its archive as .tar.xz.
    #[command(name = "dl", alias = "download")]
    Download {
        /// Repository, release, tag, branch or commit URL.
        url: String,
        /// Verbose logging.
        #[arg(long)]
        debug: bool,
        /// Mail the archive once it is on disk.
        #[arg(short, long)]
        mail: bool,
    },

    /// Resolve a repository URL and print the archive it maps to.
    Resolve {
        /// Repository, release, tag, branch or commit URL.
        url: String,
        /// Verbose logging.
        #[arg(long)]
        debug: bool,
        /// Print the descriptor as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl CliCommand {
    pub fn debug(&self) -> bool {
        match self {
            CliCommand::Download { debug, .. } | CliCommand::Resolve { debug, .. } => *debug,
        }
    }
}

impl Cli {
    fn load_config(&self) -> Result<GitarConfig> {
        match &self.config {
            Some(path) => config::read_config(path),
            None => {
                let (cfg, path) = config::load_or_init()?;
                tracing::debug!("loaded config from {}", path.display());
                Ok(cfg)
            }
        }
    }

    /// Parse args, set up logging and dispatch.
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let debug = cli.command.debug();
        if let Err(e) = logging::init_logging(debug) {
            logging::init_logging_stderr(debug);
            tracing::warn!("log file unavailable, logging to stderr only: {e:#}");
        }

        let cfg = cli.load_config()?;
        tracing::debug!("config: {:?}", cfg);

        match cli.command {
            CliCommand::Download { url, mail, .. } => run_download(&cfg, &url, mail).await?,
            CliCommand::Resolve { url, json, .. } => run_resolve(&cfg, &url, json).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
