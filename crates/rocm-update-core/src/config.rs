use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::checksum::CHUNK_SIZE;

/// Public listing endpoint of TheRock nightly tarball bucket.
pub const DEFAULT_BUCKET_URL: &str = "https://therock-nightly-tarball.s3.amazonaws.com/";

/// Global configuration loaded from `~/.config/rocm-update/config.toml`.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Bucket base URL; listings are `GET <bucket_url>?prefix=...`, objects `GET <bucket_url><key>`.
    pub bucket_url: String,
    /// Leading part of every artifact key (`<dist_prefix>-<platform>-<target>-<version><ext>`).
    pub dist_prefix: String,
    /// Archive extension that terminates the version in a key.
    pub archive_ext: String,
    /// Receive buffer size in bytes; the hasher is fed chunks of at most this size.
    pub chunk_size: usize,
    /// Connect timeout for listing and download requests.
    pub connect_timeout_secs: u64,
    /// Abort a transfer that stays below 1 KiB/s for this many seconds.
    pub low_speed_time_secs: u64,
    /// Also write downloaded bytes to a scratch file while hashing (deleted afterwards).
    pub scratch_download: bool,
    /// Directory for the scratch file (None = system temp dir).
    pub scratch_dir: Option<PathBuf>,
    /// Requested target -> storage suffix (`gfx110X` is stored as `gfx110X-dgpu`).
    pub target_suffixes: BTreeMap<String, String>,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        let mut target_suffixes = BTreeMap::new();
        target_suffixes.insert("gfx110X".to_string(), "dgpu".to_string());
        target_suffixes.insert("gfx120X".to_string(), "all".to_string());
        Self {
            bucket_url: DEFAULT_BUCKET_URL.to_string(),
            dist_prefix: "therock-dist".to_string(),
            archive_ext: ".tar.gz".to_string(),
            chunk_size: CHUNK_SIZE,
            connect_timeout_secs: 30,
            low_speed_time_secs: 60,
            scratch_download: true,
            scratch_dir: None,
            target_suffixes,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rocm-update")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<UpdateConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = UpdateConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from_path(&path)
}

/// Load configuration from an explicit path. The file must exist.
pub fn load_from_path(path: &Path) -> Result<UpdateConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: UpdateConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
