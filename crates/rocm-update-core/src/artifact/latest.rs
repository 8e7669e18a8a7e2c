//! Latest-artifact selection over a bucket listing.
//!
//! "Latest" is the byte-wise lexicographic maximum of the keys. This is only
//! correct while versions embedded in keys are fixed-width (e.g. zero-padded
//! dates); a variable-width version can make an older build sort last.

use anyhow::{Context, Result};
use regex::Regex;

use super::ArtifactNaming;

/// The newest matching key and the version extracted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestArtifact {
    pub key: String,
    pub version: String,
}

/// Outcome of selecting from one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Found(LatestArtifact),
    /// The listing had no keys.
    Empty,
    /// The lexicographically last key does not follow the naming pattern.
    VersionMismatch { key: String },
}

impl Selection {
    pub fn found(self) -> Option<LatestArtifact> {
        match self {
            Selection::Found(artifact) => Some(artifact),
            Selection::Empty | Selection::VersionMismatch { .. } => None,
        }
    }
}

fn version_pattern(naming: &ArtifactNaming, platform: &str, storage_target: &str) -> Result<Regex> {
    let pattern = format!(
        "^{}-{}-{}-(.+){}$",
        regex::escape(naming.dist_prefix()),
        regex::escape(platform),
        regex::escape(storage_target),
        regex::escape(naming.archive_ext()),
    );
    Regex::new(&pattern).with_context(|| format!("invalid version pattern {pattern}"))
}

/// Pick the latest key and extract its version.
pub fn select_latest(
    keys: &[String],
    naming: &ArtifactNaming,
    platform: &str,
    storage_target: &str,
) -> Result<Selection> {
    let mut sorted: Vec<&str> = keys.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let latest = match sorted.last() {
        Some(key) => *key,
        None => return Ok(Selection::Empty),
    };

    let pattern = version_pattern(naming, platform, storage_target)?;
    let version = pattern
        .captures(latest)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    Ok(match version {
        Some(version) => Selection::Found(LatestArtifact {
            key: latest.to_string(),
            version,
        }),
        None => Selection::VersionMismatch {
            key: latest.to_string(),
        },
    })
}
