//! Public object-storage bucket access.
//!
//! Uses the curl crate (libcurl) for blocking GETs against an S3-compatible
//! endpoint: `GET <base>?prefix=...` for listings, `GET <base><key>` for objects.

mod error;
mod parse;

pub use error::{FetchError, ListingError};
pub use parse::ListingPage;

use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

use crate::config::UpdateConfig;

/// Transfer settings shared by listing and download requests.
#[derive(Debug, Clone, Copy)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    /// Abort if the transfer stays below 1 KiB/s for this long.
    pub low_speed_time: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_time: Duration::from_secs(60),
        }
    }
}

impl HttpOptions {
    pub fn from_config(cfg: &UpdateConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            low_speed_time: Duration::from_secs(cfg.low_speed_time_secs),
        }
    }

    /// Apply redirect and timeout settings to a curl handle.
    pub fn apply(&self, easy: &mut curl::easy::Easy) -> Result<(), curl::Error> {
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(self.low_speed_time)?;
        Ok(())
    }
}

/// Client for one bucket endpoint.
#[derive(Debug, Clone)]
pub struct BucketClient {
    base: Url,
    http: HttpOptions,
}

impl BucketClient {
    /// `bucket_url` must be an absolute http(s) URL; a trailing `/` is added if missing.
    pub fn new(bucket_url: &str, http: HttpOptions) -> Result<Self> {
        let mut base =
            Url::parse(bucket_url).with_context(|| format!("invalid bucket URL: {bucket_url}"))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            anyhow::bail!("bucket URL must be http(s): {}", bucket_url);
        }
        base.set_query(None);
        base.set_fragment(None);
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Listing query for `prefix`, continuing after `marker` when paging.
    pub fn listing_url(&self, prefix: &str, marker: Option<&str>) -> Url {
        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("prefix", prefix);
            if let Some(marker) = marker {
                query.append_pair("marker", marker);
            }
        }
        url
    }

    /// Direct download URL of an object key.
    pub fn object_url(&self, key: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(key.split('/'));
        }
        url
    }

    /// All keys under `prefix`, across every page, in document order.
    pub fn list_keys(&self, prefix: &str) -> Result<Vec<String>, FetchError> {
        let mut keys = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let url = self.listing_url(prefix, marker.as_deref());
            let body = self.get_body(&url)?;
            let page = parse::parse_listing(&body)?;
            tracing::debug!(
                prefix,
                keys = page.keys.len(),
                truncated = page.is_truncated,
                "listing page"
            );

            let next = if page.is_truncated {
                page.next_marker
                    .clone()
                    .or_else(|| page.keys.last().cloned())
            } else {
                None
            };
            keys.extend(page.keys);

            match next {
                Some(next) if marker.as_deref() != Some(next.as_str()) => marker = Some(next),
                Some(_) => return Err(ListingError::NoMarker.into()),
                None if page.is_truncated => return Err(ListingError::NoMarker.into()),
                None => break,
            }
        }
        Ok(keys)
    }

    /// GET `url` into memory. Non-2xx is an error.
    fn get_body(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let curl_err = |source: curl::Error| FetchError::Curl {
            url: url.to_string(),
            source,
        };

        let mut body = Vec::new();
        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str()).map_err(curl_err)?;
        self.http.apply(&mut easy).map_err(curl_err)?;

        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(curl_err)?;
            transfer.perform().map_err(curl_err)?;
        }

        let code = easy.response_code().map_err(curl_err)?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http {
                url: url.to_string(),
                code,
            });
        }
        Ok(body)
    }
}
