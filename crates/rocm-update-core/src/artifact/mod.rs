//! Artifact key naming: `<dist_prefix>-<platform>-<storage target>-<version><ext>`.

mod latest;

pub use latest::{select_latest, LatestArtifact, Selection};

use std::collections::BTreeMap;

use crate::config::UpdateConfig;

/// How nightly tarball keys are named in the bucket.
#[derive(Debug, Clone)]
pub struct ArtifactNaming {
    dist_prefix: String,
    archive_ext: String,
    target_suffixes: BTreeMap<String, String>,
}

impl ArtifactNaming {
    pub fn new(
        dist_prefix: impl Into<String>,
        archive_ext: impl Into<String>,
        target_suffixes: BTreeMap<String, String>,
    ) -> Self {
        Self {
            dist_prefix: dist_prefix.into(),
            archive_ext: archive_ext.into(),
            target_suffixes,
        }
    }

    pub fn from_config(cfg: &UpdateConfig) -> Self {
        Self::new(
            cfg.dist_prefix.clone(),
            cfg.archive_ext.clone(),
            cfg.target_suffixes.clone(),
        )
    }

    pub fn dist_prefix(&self) -> &str {
        &self.dist_prefix
    }

    pub fn archive_ext(&self) -> &str {
        &self.archive_ext
    }

    /// Target name as stored in the bucket (`gfx110X` -> `gfx110X-dgpu`); unmapped targets are verbatim.
    pub fn storage_target(&self, target: &str) -> String {
        match self.target_suffixes.get(target) {
            Some(suffix) => format!("{target}-{suffix}"),
            None => target.to_string(),
        }
    }

    /// Listing prefix for one platform and storage target, including the trailing `-`.
    pub fn listing_prefix(&self, platform: &str, storage_target: &str) -> String {
        format!("{}-{}-{}-", self.dist_prefix, platform, storage_target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_target_applies_default_suffixes() {
        let naming = ArtifactNaming::from_config(&UpdateConfig::default());
        assert_eq!(naming.storage_target("gfx110X"), "gfx110X-dgpu");
        assert_eq!(naming.storage_target("gfx120X"), "gfx120X-all");
        assert_eq!(naming.storage_target("gfx1151"), "gfx1151");
    }

    #[test]
    fn listing_prefix_layout() {
        let naming = ArtifactNaming::from_config(&UpdateConfig::default());
        let target = naming.storage_target("gfx110X");
        assert_eq!(
            naming.listing_prefix("linux", &target),
            "therock-dist-linux-gfx110X-dgpu-"
        );
        assert_eq!(
            naming.listing_prefix("windows", "gfx1151"),
            "therock-dist-windows-gfx1151-"
        );
    }
}
