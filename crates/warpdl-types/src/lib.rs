//! Shared types for warpdl
//!
//! This crate contains the plain data structures shared between the
//! CLI and the core download engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Transfer Types
// ============================================================================

/// Configuration for a single transfer. Immutable once the engine starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Target URL
    pub url: String,
    /// Number of parallel segments (must be >= 1)
    pub concurrency: u32,
    /// Output file path; defaults to the URL's basename
    pub output: Option<PathBuf>,
    /// Resolve hostnames through DNS-over-HTTPS instead of system DNS
    pub use_doh: bool,
    /// Skip TLS certificate verification.
    ///
    /// This is an operator-level trust decision, independent of
    /// `use_doh`; enabling DoH does not change TLS validation.
    pub insecure_tls: bool,
}

impl TransferConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            concurrency: 16,
            output: None,
            use_doh: true,
            insecure_tls: false,
        }
    }

    /// Resolve the output path: the configured path, or the last
    /// non-empty path segment of the URL.
    pub fn output_path(&self) -> PathBuf {
        if let Some(path) = &self.output {
            return path.clone();
        }
        let basename = url::Url::parse(&self.url)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|s| s.last().map(str::to_string))
            })
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "download".to_string());
        PathBuf::from(basename)
    }
}

/// Process-wide HTTP constants, injected at engine construction so tests
/// can point the engine at fake origin and DoH servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// DNS-over-HTTPS provider endpoint (JSON API)
    pub doh_endpoint: String,
    /// User-Agent sent on every request, including DoH queries
    pub user_agent: String,
    /// Timeout for a single DoH query
    pub doh_timeout: Duration,
    /// TCP connect timeout for origin connections
    pub connect_timeout: Duration,
    /// TCP keep-alive interval for origin connections
    pub tcp_keepalive: Duration,
    /// Attempts per segment before the failure becomes terminal
    pub max_attempts: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            doh_endpoint: "https://cloudflare-dns.com/dns-query".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            doh_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(30),
            tcp_keepalive: Duration::from_secs(30),
            max_attempts: 3,
        }
    }
}

// ============================================================================
// Segment Types
// ============================================================================

/// A contiguous byte range of the resource, fetched independently.
///
/// `end == u64::MAX` marks an open-ended segment for resources of
/// unknown length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub index: u32,
    /// Inclusive start offset
    pub start: u64,
    /// Inclusive end offset
    pub end: u64,
    /// Bytes written to the temp file so far
    pub downloaded: u64,
}

impl Segment {
    pub fn new(index: u32, start: u64, end: u64) -> Self {
        Self {
            index,
            start,
            end,
            downloaded: 0,
        }
    }

    /// Size of this segment in bytes; `u64::MAX` when open-ended.
    pub fn size(&self) -> u64 {
        if self.is_unknown_size() {
            u64::MAX
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_unknown_size(&self) -> bool {
        self.end == u64::MAX
    }

    /// Temp file path for this segment, derived deterministically from
    /// the output path: `<output>.part<index>`.
    pub fn temp_path(&self, output: &Path) -> PathBuf {
        let mut name = output.as_os_str().to_os_string();
        name.push(format!(".part{}", self.index));
        PathBuf::from(name)
    }
}

// ============================================================================
// Probe Types
// ============================================================================

/// What the preliminary probe learned about the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeInfo {
    /// Total resource size, when the server declared one
    pub size: Option<u64>,
    /// Whether the server honors byte-range requests
    pub resumable: bool,
}
