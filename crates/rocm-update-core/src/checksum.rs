//! Streaming SHA-256 over downloaded chunks.
//!
//! The digest is computed inline with the download; an optional scratch file
//! receives the same bytes and is removed when the sink is finished or dropped.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Default chunk size for reading response bodies.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Rolling SHA-256 accumulator, optionally mirroring bytes into a scratch file.
pub struct HashingSink {
    hasher: Sha256,
    scratch: Option<NamedTempFile>,
    bytes: u64,
}

impl HashingSink {
    /// Hash only; nothing is written to disk.
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            scratch: None,
            bytes: 0,
        }
    }

    /// Hash and mirror into a scratch file under `dir` (system temp dir if None).
    pub fn with_scratch(dir: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("rocm-update-").suffix(".part");
        let file = match dir {
            Some(dir) => builder
                .tempfile_in(dir)
                .with_context(|| format!("create scratch file in {}", dir.display()))?,
            None => builder.tempfile().context("create scratch file")?,
        };
        tracing::debug!(path = %file.path().display(), "scratch file created");
        Ok(Self {
            hasher: Sha256::new(),
            scratch: Some(file),
            bytes: 0,
        })
    }

    /// Feed one chunk into the digest (and the scratch file, if any).
    pub fn update(&mut self, chunk: &[u8]) -> io::Result<()> {
        if let Some(file) = self.scratch.as_mut() {
            file.write_all(chunk)?;
        }
        self.hasher.update(chunk);
        self.bytes += chunk.len() as u64;
        Ok(())
    }

    /// Bytes fed so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_ref().map(|f| f.path())
    }

    /// Finish the digest and return it as lowercase hex. Deletes the scratch file.
    pub fn finish(self) -> String {
        drop(self.scratch);
        hex::encode(self.hasher.finalize())
    }
}

impl Default for HashingSink {
    fn default() -> Self {
        Self::new()
    }
}
