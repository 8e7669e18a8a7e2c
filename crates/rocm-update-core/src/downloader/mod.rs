//! Streaming download-and-hash of a single object.
//!
//! A plain GET whose body is fed chunk by chunk into [`HashingSink`]; nothing
//! outlives the call except the digest.

mod headers;
mod progress;

pub use progress::DownloadProgress;

use anyhow::{Context, Result};
use std::cell::Cell;
use std::path::PathBuf;
use std::str;

use crate::bucket::HttpOptions;
use crate::checksum::{HashingSink, CHUNK_SIZE};
use crate::config::UpdateConfig;
use headers::HeaderLine;

/// Settings for [`download_sha256`].
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub http: HttpOptions,
    /// Receive buffer size; each hashed chunk is at most this long.
    pub chunk_size: usize,
    /// Mirror the body into a scratch file while hashing.
    pub scratch: bool,
    pub scratch_dir: Option<PathBuf>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            http: HttpOptions::default(),
            chunk_size: CHUNK_SIZE,
            scratch: false,
            scratch_dir: None,
        }
    }
}

impl DownloadOptions {
    pub fn from_config(cfg: &UpdateConfig) -> Self {
        Self {
            http: HttpOptions::from_config(cfg),
            chunk_size: cfg.chunk_size,
            scratch: cfg.scratch_download,
            scratch_dir: cfg.scratch_dir.clone(),
        }
    }
}

/// Result of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Lowercase hex SHA-256 of the body.
    pub sha256: String,
    pub bytes: u64,
}

/// Downloads `url` and returns the SHA-256 of its body.
///
/// `on_progress` is called after every received chunk. The scratch file, if
/// enabled, is removed before this returns, on success and on error alike.
pub fn download_sha256(
    url: &str,
    opts: &DownloadOptions,
    on_progress: &mut dyn FnMut(&DownloadProgress),
) -> Result<Download> {
    let mut sink = if opts.scratch {
        HashingSink::with_scratch(opts.scratch_dir.as_deref())?
    } else {
        HashingSink::new()
    };
    let total: Cell<Option<u64>> = Cell::new(None);
    let mut write_err: Option<std::io::Error> = None;

    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    opts.http.apply(&mut easy)?;
    easy.buffer_size(opts.chunk_size)?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(line) = str::from_utf8(data) {
                match headers::classify(line) {
                    HeaderLine::Status => total.set(None),
                    HeaderLine::ContentLength(n) => total.set(Some(n)),
                    HeaderLine::Other => {}
                }
            }
            true
        })?;
        transfer.write_function(|data| {
            if let Err(e) = sink.update(data) {
                write_err = Some(e);
                return Ok(0); // abort transfer
            }
            on_progress(&DownloadProgress {
                bytes_done: sink.bytes(),
                total_bytes: total.get(),
            });
            Ok(data.len())
        })?;
        transfer.perform()
    };

    if let Some(e) = write_err {
        return Err(anyhow::Error::new(e).context("write scratch file"));
    }
    performed.with_context(|| format!("GET {url} failed"))?;

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("GET {} returned HTTP {}", url, code);
    }

    let bytes = sink.bytes();
    if let Some(expected) = total.get() {
        if bytes != expected {
            anyhow::bail!("partial transfer: received {} of {} bytes", bytes, expected);
        }
    }

    let sha256 = sink.finish();
    tracing::debug!(url, bytes, %sha256, "download hashed");
    Ok(Download { sha256, bytes })
}
