//! Error types for the warpdl engine

use thiserror::Error;

/// Errors that can occur during a transfer
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Probe failed with status {status}")]
    Probe { status: u16 },

    #[error("Server returned unexpected status {status}")]
    ServerError { status: u16 },

    #[error("Segment {index} truncated: expected {expected} bytes, got {written}")]
    SegmentTruncated {
        index: u32,
        expected: u64,
        written: u64,
    },

    #[error("Segment {index} failed after {attempts} attempts: {source}")]
    SegmentFailed {
        index: u32,
        attempts: u32,
        source: Box<EngineError>,
    },

    #[error("Transfer was cancelled")]
    Cancelled,
}

impl EngineError {
    /// Cancellation always takes priority over retry accounting and is
    /// propagated verbatim, never wrapped in a retry-exhaustion error.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}
