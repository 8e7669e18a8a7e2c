//! Progress of one object download.

/// Snapshot of download progress, emitted once per received chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Bytes hashed so far.
    pub bytes_done: u64,
    /// `Content-Length` of the final response, when the server sent one.
    pub total_bytes: Option<u64>,
}

impl DownloadProgress {
    /// Fraction complete in [0.0, 1.0]; None without a known total.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            None => None,
            Some(0) => Some(1.0),
            Some(total) => Some((self.bytes_done as f64 / total as f64).min(1.0)),
        }
    }

    /// Percentage complete, for display.
    pub fn percent(&self) -> Option<f64> {
        self.fraction().map(|f| f * 100.0)
    }

    pub fn is_complete(&self) -> bool {
        self.total_bytes.is_some_and(|total| self.bytes_done >= total)
    }
}
