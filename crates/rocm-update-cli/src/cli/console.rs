//! Console rendering of update events.

use rocm_update_core::downloader::DownloadProgress;
use rocm_update_core::updater::{MissReason, UpdateEvent};
use std::io::Write;
use std::time::{Duration, Instant};

pub(crate) const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Prints run events; download progress is redrawn in place and throttled.
pub(crate) struct Console {
    last_draw: Option<Instant>,
    /// Latest snapshot not yet drawn because of throttling.
    pending: Option<DownloadProgress>,
    line_open: bool,
}

impl Console {
    pub(crate) fn new() -> Self {
        Self {
            last_draw: None,
            pending: None,
            line_open: false,
        }
    }

    pub(crate) fn handle(&mut self, ev: UpdateEvent<'_>) {
        match ev {
            UpdateEvent::Processing { platform, target } => {
                println!("\nProcessing {}/{}...", platform, target);
            }
            UpdateEvent::Listing { url } => println!("Fetching S3 listing from: {}", url),
            UpdateEvent::NotFound {
                platform,
                target,
                prefix,
                reason,
            } => {
                match reason {
                    MissReason::NoObjects => println!("No files found for prefix: {}", prefix),
                    MissReason::VersionMismatch { key } => {
                        println!("Latest file does not match the expected naming: {}", key)
                    }
                }
                eprintln!("  WARNING: No file found for {}/{}", platform, target);
            }
            UpdateEvent::Downloading { url } => println!("Downloading and hashing: {}", url),
            UpdateEvent::Progress(p) => self.progress(p),
            UpdateEvent::Recorded { record, .. } => {
                self.end_progress();
                println!("  Version: {}", record.version);
                println!("  SHA256: {}", record.sha256);
            }
        }
    }

    fn progress(&mut self, p: &DownloadProgress) {
        let now = Instant::now();
        let due = self
            .last_draw
            .map_or(true, |last| now.duration_since(last) >= PROGRESS_INTERVAL);
        if !due && !p.is_complete() {
            self.pending = Some(*p);
            return;
        }
        self.draw(p);
        self.last_draw = Some(now);
    }

    fn draw(&mut self, p: &DownloadProgress) {
        print!("\r{}", format_progress(p));
        let _ = std::io::stdout().flush();
        self.pending = None;
        self.line_open = true;
    }

    /// Flush the last snapshot and finish the progress line.
    fn end_progress(&mut self) {
        if let Some(p) = self.pending.take() {
            self.draw(&p);
        }
        if self.line_open {
            println!();
        }
        self.line_open = false;
        self.last_draw = None;
    }
}

/// One progress line; the percentage is only shown when the total is known.
pub(crate) fn format_progress(p: &DownloadProgress) -> String {
    match (p.percent(), p.total_bytes) {
        (Some(percent), Some(total)) => format!(
            "  Progress: {:.1}% ({}/{} bytes)",
            percent, p.bytes_done, total
        ),
        _ => format!("  Downloaded: {} bytes", p.bytes_done),
    }
}
