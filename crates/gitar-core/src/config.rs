use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP: &str = "gitar";

/// Directories used by a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Holds the dedup store (`gitar.sqlite`).
    pub data: PathBuf,
    /// Root of the archive tree: `<repo>/<platform>/<owner>/<repo>/<name>.tar.xz`.
    pub repo: PathBuf,
    /// Staging area for downloads and lock files.
    pub temp: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data = xdg::BaseDirectories::with_prefix(APP)
            .map(|d| d.get_data_home())
            .unwrap_or_else(|_| PathBuf::from(".gitar"));
        Self {
            repo: data.join("repo"),
            temp: std::env::temp_dir().join(APP),
            data,
        }
    }
}

/// Access token for one platform's listing API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Listing API call limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Attempts per call when it times out (including the first).
    pub max_attempts: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_attempts: 5,
        }
    }
}

/// Archive fetcher: external `aria2c` (default) or in-process libcurl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchTool {
    #[default]
    Aria2c,
    Curl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub tool: FetchTool,
    pub max_tries: u32,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            tool: FetchTool::Aria2c,
            max_tries: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressConfig {
    pub program: String,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            program: "xz".to_string(),
        }
    }
}

/// Mail step settings; delay between attempts is `min(attempt^3, max_delay_secs)` seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub program: String,
    pub profile: String,
    pub max_attempts: u32,
    pub max_delay_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            program: "filemailer".to_string(),
            profile: APP.to_string(),
            max_attempts: 999,
            max_delay_secs: 7200,
        }
    }
}

/// Global configuration, TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GitarConfig {
    pub paths: PathsConfig,
    pub github: TokenConfig,
    pub gitee: TokenConfig,
    pub listing: ListingConfig,
    pub download: DownloadConfig,
    pub compress: CompressConfig,
    pub notify: NotifyConfig,
}

/// Candidate config files, most specific first.
pub fn config_search_path() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("gitar.toml"), PathBuf::from("config.toml")];
    if let Ok(xdg_dirs) = xdg::BaseDirectories::with_prefix(APP) {
        paths.push(xdg_dirs.get_config_home().join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        paths.push(home.join(".gitar").join("config.toml"));
        paths.push(home.join(".gitar.toml"));
    }
    paths.push(PathBuf::from("/etc/gitar/config.toml"));
    paths.push(PathBuf::from("/etc/gitar.toml"));
    paths
}

/// First existing regular file among `candidates`, made absolute.
pub fn lookup_config_file(candidates: &[PathBuf]) -> Result<Option<PathBuf>> {
    for path in candidates {
        if path.is_file() {
            let full = std::path::absolute(path)
                .with_context(|| format!("resolve {}", path.display()))?;
            return Ok(Some(full));
        }
    }
    Ok(None)
}

/// Load a config file.
pub fn read_config(path: &Path) -> Result<GitarConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: GitarConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

pub fn default_config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix(APP)?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load the first config on the search path, creating a default file at the
/// XDG location if none exists.
pub fn load_or_init() -> Result<(GitarConfig, PathBuf)> {
    if let Some(path) = lookup_config_file(&config_search_path())? {
        let cfg = read_config(&path)?;
        return Ok((cfg, path));
    }

    let path = default_config_path()?;
    let default_cfg = GitarConfig::default();
    let toml = toml::to_string_pretty(&default_cfg)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, toml)?;
    tracing::info!("created default config at {}", path.display());
    Ok((default_cfg, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = GitarConfig::default();
        assert_eq!(cfg.listing.timeout_secs, 10);
        assert_eq!(cfg.listing.max_attempts, 5);
        assert_eq!(cfg.download.tool, FetchTool::Aria2c);
        assert_eq!(cfg.notify.max_attempts, 999);
        assert_eq!(cfg.notify.max_delay_secs, 7200);
        assert_eq!(cfg.compress.program, "xz");
        assert!(cfg.github.token.is_none());
        assert!(cfg.paths.repo.ends_with("repo"));
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = GitarConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: GitarConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.paths.data, cfg.paths.data);
        assert_eq!(parsed.notify.profile, cfg.notify.profile);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml = r#"
            [paths]
            data = "/srv/gitar/data"
            repo = "/srv/gitar/repo"
            temp = "/srv/gitar/tmp"

            [github]
            token = "ghp_x"

            [download]
            tool = "curl"
        "#;
        let cfg: GitarConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.paths.repo, PathBuf::from("/srv/gitar/repo"));
        assert_eq!(cfg.github.token.as_deref(), Some("ghp_x"));
        assert!(cfg.gitee.token.is_none());
        assert_eq!(cfg.download.tool, FetchTool::Curl);
        assert_eq!(cfg.download.max_tries, 16);
        assert_eq!(cfg.listing.max_attempts, 5);
    }

    #[test]
    fn lookup_skips_missing_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let a_dir = dir.path().join("config.toml");
        fs::create_dir(&a_dir).unwrap();
        let real = dir.path().join("gitar.toml");
        fs::write(&real, "[notify]\nprofile = \"ops\"\n").unwrap();

        let found = lookup_config_file(&[missing, a_dir, real.clone()]).unwrap();
        assert_eq!(found, Some(real.clone()));
        assert_eq!(read_config(&real).unwrap().notify.profile, "ops");
    }

    #[test]
    fn lookup_none_when_nothing_exists() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(lookup_config_file(&[dir.path().join("x.toml")]).unwrap(), None);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("gitar.toml");
        fs::write(&p, "[paths\n").unwrap();
        assert!(read_config(&p).is_err());
    }
}
