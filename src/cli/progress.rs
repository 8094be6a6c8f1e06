//! Progress bar and summary reporting for CLI installs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::cache::InstallProgress;
use crate::manifest::AssetManifest;
use crate::stats::InstallStats;

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Install progress rendered as a single manifest-wide bar.
pub struct InstallBar {
    bar: ProgressBar,
}

impl InstallBar {
    /// Creates a bar sized to the number of manifest entries.
    #[must_use]
    pub fn new(total_assets: usize) -> Self {
        let bar = ProgressBar::new(total_assets as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} assets - {msg}",
            )
            .expect("progress template is valid")
            .progress_chars("━━╌"),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Finishes the bar, keeping it on screen.
    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }

    /// Abandons the bar after a failed install.
    pub fn abandon(&self) {
        self.bar.abandon_with_message("install failed");
    }
}

impl InstallProgress for InstallBar {
    fn on_asset_start(&self, url: &str) {
        self.bar.set_message(url.to_string());
    }

    fn on_asset_staged(&self, _url: &str, _bytes: u64) {
        self.bar.inc(1);
    }

    fn on_asset_failed(&self, url: &str, error: &str) {
        self.bar
            .println(format!("  {} {url}: {error}", console::style("✗").red()));
    }
}

/// Prints the manifest about to be installed. Entries are shown as
/// configured; relative ones are resolved against the origin during install.
pub fn print_manifest(bucket: &str, origin: &str, manifest: &AssetManifest) {
    println!("\n{SEPARATOR}");
    println!("Installing bucket {} from {origin}", console::style(bucket).cyan());
    println!("{SEPARATOR}");
    for url in manifest {
        println!("  {url}");
    }
    println!("{SEPARATOR}\n");
}

/// Prints a summary of a completed install.
pub fn print_summary(stats: &InstallStats) {
    println!("\n{SEPARATOR}");
    println!("Install Summary");
    println!("{SEPARATOR}");
    println!("  Assets cached:  {}", stats.assets_cached);
    println!("  Total size:     {}", format_bytes(stats.total_bytes));
    println!("  Total time:     {}", format_duration(stats.elapsed));
    println!("{SEPARATOR}");
}

/// Formats a byte count as a human-readable string (B, KB, MB, GB).
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// Formats a duration as a human-readable string (e.g. "0.4s", "1m 05s").
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}.{:01}s", secs, d.subsec_millis() / 100)
    }
}
