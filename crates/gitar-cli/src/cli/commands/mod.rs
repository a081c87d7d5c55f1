//! CLI command handlers, one per file.

mod download;
mod resolve;

pub use download::run_download;
pub use resolve::run_resolve;
