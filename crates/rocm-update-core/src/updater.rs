//! Update run: for every platform/target pair, list, select, hash and record.
//!
//! Pairs are processed strictly in order (platforms outer, targets inner).
//! A pair with no matching artifact is skipped; any transport, parse or I/O
//! failure ends the run with an error and nothing is written.

use anyhow::{Context, Result};

use crate::artifact::{select_latest, ArtifactNaming, LatestArtifact, Selection};
use crate::bucket::{BucketClient, HttpOptions};
use crate::config::UpdateConfig;
use crate::downloader::{self, DownloadOptions, DownloadProgress};
use crate::manifest::{timestamp_now, Manifest, SourceRecord};

/// Why a pair was left out of the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// The listing under the prefix was empty.
    NoObjects,
    /// The latest key did not follow the naming pattern.
    VersionMismatch { key: String },
}

/// Progress of an update run, for console rendering.
#[derive(Debug)]
pub enum UpdateEvent<'a> {
    Processing { platform: &'a str, target: &'a str },
    Listing { url: &'a str },
    NotFound {
        platform: &'a str,
        target: &'a str,
        prefix: &'a str,
        reason: &'a MissReason,
    },
    Downloading { url: &'a str },
    Progress(&'a DownloadProgress),
    Recorded {
        platform: &'a str,
        target: &'a str,
        record: &'a SourceRecord,
    },
}

/// Resolves and records the latest artifacts of one bucket.
#[derive(Debug, Clone)]
pub struct Updater {
    client: BucketClient,
    naming: ArtifactNaming,
    download: DownloadOptions,
}

impl Updater {
    pub fn new(client: BucketClient, naming: ArtifactNaming, download: DownloadOptions) -> Self {
        Self {
            client,
            naming,
            download,
        }
    }

    pub fn from_config(cfg: &UpdateConfig) -> Result<Self> {
        let client = BucketClient::new(&cfg.bucket_url, HttpOptions::from_config(cfg))?;
        Ok(Self::new(
            client,
            ArtifactNaming::from_config(cfg),
            DownloadOptions::from_config(cfg),
        ))
    }

    pub fn client(&self) -> &BucketClient {
        &self.client
    }

    /// Latest artifact for one pair. A miss is reported as [`UpdateEvent::NotFound`].
    pub fn find_latest(
        &self,
        platform: &str,
        target: &str,
        on_event: &mut dyn FnMut(UpdateEvent<'_>),
    ) -> Result<Option<LatestArtifact>> {
        let storage_target = self.naming.storage_target(target);
        let prefix = self.naming.listing_prefix(platform, &storage_target);
        let listing_url = self.client.listing_url(&prefix, None);
        on_event(UpdateEvent::Listing {
            url: listing_url.as_str(),
        });

        let keys = self
            .client
            .list_keys(&prefix)
            .with_context(|| format!("list {platform}/{target}"))?;

        let reason = match select_latest(&keys, &self.naming, platform, &storage_target)? {
            Selection::Found(latest) => return Ok(Some(latest)),
            Selection::Empty => MissReason::NoObjects,
            Selection::VersionMismatch { key } => MissReason::VersionMismatch { key },
        };
        tracing::warn!(platform, target, %prefix, ?reason, "no artifact found");
        on_event(UpdateEvent::NotFound {
            platform,
            target,
            prefix: &prefix,
            reason: &reason,
        });
        Ok(None)
    }

    /// Download and hash `latest`, producing its manifest record.
    pub fn record(
        &self,
        latest: &LatestArtifact,
        on_event: &mut dyn FnMut(UpdateEvent<'_>),
    ) -> Result<SourceRecord> {
        let url = self.client.object_url(&latest.key).to_string();
        on_event(UpdateEvent::Downloading { url: &url });

        let download = downloader::download_sha256(&url, &self.download, &mut |p: &DownloadProgress| {
            on_event(UpdateEvent::Progress(p))
        })
        .with_context(|| format!("hash {}", latest.key))?;

        Ok(SourceRecord {
            url,
            sha256: download.sha256,
            version: latest.version.clone(),
            filename: latest.key.clone(),
            updated: timestamp_now(),
        })
    }

    /// Process every pair and return the manifest. Every platform appears in
    /// the result; pairs without an artifact are absent.
    pub fn update_sources(
        &self,
        platforms: &[String],
        targets: &[String],
        on_event: &mut dyn FnMut(UpdateEvent<'_>),
    ) -> Result<Manifest> {
        let mut manifest = Manifest::new();

        for platform in platforms {
            manifest.ensure_platform(platform);

            for target in targets {
                on_event(UpdateEvent::Processing {
                    platform: platform.as_str(),
                    target: target.as_str(),
                });

                let latest = match self.find_latest(platform, target, on_event)? {
                    Some(latest) => latest,
                    None => continue,
                };
                let record = self.record(&latest, on_event)?;
                tracing::info!(
                    platform = %platform,
                    target = %target,
                    version = %record.version,
                    sha256 = %record.sha256,
                    "recorded artifact"
                );
                on_event(UpdateEvent::Recorded {
                    platform: platform.as_str(),
                    target: target.as_str(),
                    record: &record,
                });
                manifest.insert(platform, target, record);
            }
        }

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_uses_bucket_url() {
        let mut cfg = UpdateConfig::default();
        cfg.bucket_url = "http://127.0.0.1:1/bucket".to_string();
        let updater = Updater::from_config(&cfg).unwrap();
        assert_eq!(updater.client().base_url().as_str(), "http://127.0.0.1:1/bucket/");
    }

    #[test]
    fn from_config_rejects_bad_bucket_url() {
        let mut cfg = UpdateConfig::default();
        cfg.bucket_url = "s3://therock".to_string();
        assert!(Updater::from_config(&cfg).is_err());
    }

    #[test]
    fn nothing_requested_yields_empty_manifest() {
        let updater = Updater::from_config(&UpdateConfig::default()).unwrap();
        let manifest = updater.update_sources(&[], &[], &mut |_| {}).unwrap();
        assert_eq!(manifest.record_count(), 0);
        assert_eq!(manifest.platform_names().count(), 0);
    }

    #[test]
    fn unreachable_bucket_is_fatal() {
        let mut cfg = UpdateConfig::default();
        // Port 1 on loopback: connection refused.
        cfg.bucket_url = "http://127.0.0.1:1/".to_string();
        cfg.connect_timeout_secs = 2;
        let updater = Updater::from_config(&cfg).unwrap();
        let err = updater
            .update_sources(&["linux".to_string()], &["gfx1151".to_string()], &mut |_| {})
            .unwrap_err();
        assert!(format!("{:#}", err).contains("linux/gfx1151"));
    }
}
