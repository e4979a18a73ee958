//! Shared transfer statistics
//!
//! A lock-free byte counter written by every segment worker and polled
//! by the progress renderer. Readers may observe slightly stale values;
//! that is fine, the renderer tolerates it.

use std::sync::atomic::{AtomicU64, Ordering};

/// Total and downloaded byte counts for one transfer.
///
/// `add_downloaded` is the only mutation workers perform; there is no
/// wider lock because the counter has no invariant beyond monotonic
/// growth relative to its writers. The one exception is `retract`,
/// used when a failed segment attempt is truncated and restarted so the
/// counter keeps matching the bytes actually on disk.
#[derive(Debug, Default)]
pub struct TransferStats {
    /// Total resource size; 0 until the probe (or stream end) learns it
    total: AtomicU64,
    downloaded: AtomicU64,
}

impl TransferStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the total size. Set once after the probe; for transfers of
    /// unknown length, set from the final byte count when the stream ends.
    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Release);
    }

    pub fn total(&self) -> Option<u64> {
        match self.total.load(Ordering::Acquire) {
            0 => None,
            n => Some(n),
        }
    }

    pub fn add_downloaded(&self, n: u64) {
        self.downloaded.fetch_add(n, Ordering::AcqRel);
    }

    /// Roll back bytes from a truncated attempt.
    pub fn retract(&self, n: u64) {
        self.downloaded.fetch_sub(n, Ordering::AcqRel);
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Acquire)
    }

    /// Completed fraction in `[0, 1]`; 0 while the total is unknown.
    pub fn fraction(&self) -> f64 {
        match self.total() {
            Some(total) => self.downloaded() as f64 / total as f64,
            None => 0.0,
        }
    }
}
