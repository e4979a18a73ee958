//! Progress bar for a running transfer
//!
//! The renderer only polls the engine's shared counter; there is no
//! callback channel. Stale reads are fine at a 100ms cadence.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use warpdl_core::TransferStats;

pub fn transfer_bar(output: &Path) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
            .unwrap()
            .progress_chars("█▓▒░  "),
    );
    pb.set_message(output.display().to_string());
    pb
}

pub fn update(pb: &ProgressBar, stats: &Arc<TransferStats>) {
    if let Some(total) = stats.total() {
        pb.set_length(total);
    }
    pb.set_position(stats.downloaded());
}
