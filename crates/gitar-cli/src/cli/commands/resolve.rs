//! `gitar resolve <url>` – print the commit-pinned archive without touching disk state.

use anyhow::{Context, Result};
use gitar_core::config::GitarConfig;
use gitar_core::pipeline::{self, listing_client};
use gitar_core::retry::RetryPolicy;
use std::sync::Arc;

pub async fn run_resolve(cfg: &GitarConfig, url: &str, json: bool) -> Result<()> {
    let client = Arc::new(listing_client(cfg));
    let retry = RetryPolicy::listing(cfg.listing.max_attempts);
    let (_, archive) = pipeline::resolve(client, retry, url).await?;

    if json {
        let out = serde_json::to_string_pretty(&archive).context("encode archive")?;
        println!("{out}");
    } else {
        println!("name:   {}", archive.name);
        println!("commit: {}", archive.commit);
        println!("tar:    {}", archive.tar_url);
        println!("zip:    {}", archive.zip_url);
    }
    Ok(())
}
