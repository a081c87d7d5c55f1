//! `gitar dl <url> [--mail]` – resolve, download, recompress and optionally mail.

use anyhow::Result;
use gitar_core::config::GitarConfig;
use gitar_core::pipeline::{Disposition, DownloadOrchestrator, NotifyOutcome};
use gitar_core::storage::human_size;

pub async fn run_download(cfg: &GitarConfig, url: &str, mail: bool) -> Result<()> {
    let orchestrator = DownloadOrchestrator::from_config(cfg).await?;
    let report = orchestrator.run(url, mail).await?;

    let archive = &report.archive;
    match report.disposition {
        Disposition::AlreadyRecorded => {
            println!("{} ({}) already downloaded", archive.name, archive.commit)
        }
        Disposition::AlreadyOnDisk => {
            println!("{} already at {}", archive.name, report.destination.display())
        }
        Disposition::Staged {
            gzip_bytes,
            xz_bytes,
        } => println!(
            "{} -> {} ({} gz, {} xz)",
            archive.name,
            report.destination.display(),
            human_size(gzip_bytes),
            human_size(xz_bytes)
        ),
    }
    match report.notification {
        Some(NotifyOutcome::Sent { attempts }) => println!("mailed after {attempts} attempt(s)"),
        Some(NotifyOutcome::AlreadySent) => println!("already mailed"),
        None => {}
    }
    Ok(())
}
