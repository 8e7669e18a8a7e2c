//! CLI for updating the ROCm sources manifest.

mod console;

use anyhow::Result;
use clap::Parser;
use rocm_update_core::config;
use rocm_update_core::manifest::{Manifest, DEFAULT_OUTPUT};
use rocm_update_core::updater::Updater;
use std::path::PathBuf;

use console::Console;

/// Fetch the latest TheRock nightly ROCm tarballs and record their hashes.
#[derive(Debug, Parser)]
#[command(name = "rocm-update")]
#[command(about = "Update ROCm sources from TheRock S3 bucket", long_about = None)]
pub struct Cli {
    /// Comma-separated list of GPU targets.
    #[arg(long, default_value = "gfx110X,gfx1151,gfx120X", value_name = "LIST")]
    pub targets: String,

    /// Comma-separated list of platforms.
    #[arg(long, default_value = "linux", value_name = "LIST")]
    pub platforms: String,

    /// Output JSON file.
    #[arg(long, default_value = DEFAULT_OUTPUT, value_name = "PATH")]
    pub output: PathBuf,

    /// Config file to use instead of the one under the XDG config dir.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Bucket URL for this run (overrides the config file).
    #[arg(long, value_name = "URL")]
    pub bucket_url: Option<String>,
}

/// Split a comma-separated list: items trimmed, empties and repeats dropped, order kept.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !items.iter().any(|seen| seen == item) {
            items.push(item.to_string());
        }
    }
    items
}

impl Cli {
    pub fn run_from_args() -> Result<()> {
        Cli::parse().run()
    }

    pub fn run(self) -> Result<()> {
        let targets = split_list(&self.targets);
        if targets.is_empty() {
            anyhow::bail!("no targets given (--targets)");
        }
        let platforms = split_list(&self.platforms);
        if platforms.is_empty() {
            anyhow::bail!("no platforms given (--platforms)");
        }

        let mut cfg = match &self.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        if let Some(url) = self.bucket_url {
            cfg.bucket_url = url;
        }
        tracing::debug!("loaded config: {:?}", cfg);

        println!("Updating ROCm sources for:");
        println!("  Targets: {}", targets.join(", "));
        println!("  Platforms: {}", platforms.join(", "));

        let updater = Updater::from_config(&cfg)?;
        let mut console = Console::new();
        let manifest = updater.update_sources(&platforms, &targets, &mut |ev| console.handle(ev))?;

        manifest.write_to(&self.output)?;
        tracing::info!(
            path = %self.output.display(),
            records = manifest.record_count(),
            "manifest written"
        );
        println!("\nUpdated {}", self.output.display());
        println!("\nSuccess! ROCm sources updated.");
        print_summary(&manifest);
        Ok(())
    }
}

fn print_summary(manifest: &Manifest) {
    println!("\nSummary:");
    for (platform, target, record) in manifest.records() {
        println!("  {}/{}: {}", platform, target, record.version);
    }
}

#[cfg(test)]
mod tests;
