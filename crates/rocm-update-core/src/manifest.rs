//! Sources manifest: platform -> target -> [`SourceRecord`], written as pretty JSON.

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Default output file name.
pub const DEFAULT_OUTPUT: &str = "rocm-sources.json";

/// One recorded artifact. `sha256` is always the digest of the bytes fetched from `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub url: String,
    pub sha256: String,
    pub version: String,
    pub filename: String,
    /// RFC 3339 UTC timestamp of when the record was made.
    pub updated: String,
}

/// Current UTC time in the manifest's timestamp format (`2024-02-02T10:11:12.123456Z`).
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Two-level mapping of platform to target to record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    platforms: BTreeMap<String, BTreeMap<String, SourceRecord>>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `platform` is present, even if none of its targets end up recorded.
    pub fn ensure_platform(&mut self, platform: &str) {
        self.platforms.entry(platform.to_string()).or_default();
    }

    pub fn insert(&mut self, platform: &str, target: &str, record: SourceRecord) {
        self.platforms
            .entry(platform.to_string())
            .or_default()
            .insert(target.to_string(), record);
    }

    pub fn get(&self, platform: &str, target: &str) -> Option<&SourceRecord> {
        self.platforms.get(platform)?.get(target)
    }

    pub fn platform(&self, platform: &str) -> Option<&BTreeMap<String, SourceRecord>> {
        self.platforms.get(platform)
    }

    pub fn platform_names(&self) -> impl Iterator<Item = &str> {
        self.platforms.keys().map(String::as_str)
    }

    /// All records as `(platform, target, record)`.
    pub fn records(&self) -> impl Iterator<Item = (&str, &str, &SourceRecord)> {
        self.platforms.iter().flat_map(|(platform, targets)| {
            targets
                .iter()
                .map(move |(target, record)| (platform.as_str(), target.as_str(), record))
        })
    }

    pub fn record_count(&self) -> usize {
        self.platforms.values().map(BTreeMap::len).sum()
    }

    /// Pretty JSON (2-space indent) with a trailing newline.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self).context("serialize manifest")?;
        json.push('\n');
        Ok(json)
    }

    /// Replace `path` with this manifest. Writes a temp file next to it, then renames.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty()?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = tempfile::Builder::new()
            .prefix(".rocm-sources-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .with_context(|| format!("create temp file in {}", dir.display()))?;
        tmp.write_all(json.as_bytes())
            .context("write manifest temp file")?;
        tmp.as_file().sync_all().context("sync manifest temp file")?;
        tmp.persist(path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("parse {}", path.display()))
    }
}
