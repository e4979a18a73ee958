//! Segment worker - fetches a single segment to a temporary file
//!
//! Each worker owns its segment and its temp file exclusively until the
//! merge. Failed attempts are retried with linear backoff; each attempt
//! truncates the temp file and restarts the range from scratch, rolling
//! its byte count back out of the shared counter, so retries never
//! duplicate bytes and observed progress never overshoots the total.

use crate::error::EngineError;
use crate::progress::TransferStats;
use futures::StreamExt;
use reqwest::{header, Client, StatusCode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use warpdl_types::Segment;

/// Downloads one byte range (or the whole resource) to a temp file.
pub struct SegmentWorker {
    segment: Segment,
    url: String,
    temp_path: PathBuf,
    /// Send a Range header; false for the single-segment fallback
    ranged: bool,
    client: Client,
    stats: Arc<TransferStats>,
    cancel: CancellationToken,
    max_attempts: u32,
}

impl SegmentWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        segment: Segment,
        url: String,
        output: &Path,
        ranged: bool,
        client: Client,
        stats: Arc<TransferStats>,
        cancel: CancellationToken,
        max_attempts: u32,
    ) -> Self {
        let temp_path = segment.temp_path(output);
        Self {
            segment,
            url,
            temp_path,
            ranged,
            client,
            stats,
            cancel,
            max_attempts,
        }
    }

    /// Run the segment download, retrying up to `max_attempts` times
    /// with a linear backoff of `attempt` seconds.
    ///
    /// Cancellation aborts immediately, during streaming or backoff, and
    /// is reported as [`EngineError::Cancelled`] rather than exhaustion.
    pub async fn run(mut self) -> Result<u64, EngineError> {
        info!(
            segment = self.segment.index,
            start = self.segment.start,
            end = self.segment.end,
            "starting segment"
        );

        let mut attempt = 1u32;
        loop {
            match self.attempt().await {
                Ok(written) => {
                    info!(
                        segment = self.segment.index,
                        bytes = written,
                        "segment complete"
                    );
                    return Ok(written);
                }
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) if attempt < self.max_attempts => {
                    let backoff = Duration::from_secs(attempt as u64);
                    warn!(
                        segment = self.segment.index,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        backoff_secs = backoff.as_secs(),
                        "segment attempt failed, retrying"
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(EngineError::Cancelled),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    attempt += 1;
                }
                Err(err) => {
                    return Err(EngineError::SegmentFailed {
                        index: self.segment.index,
                        attempts: self.max_attempts,
                        source: Box::new(err),
                    });
                }
            }
        }
    }

    /// One full attempt. On failure the temp file is abandoned (the next
    /// attempt truncates it) and this attempt's bytes are retracted from
    /// the shared counter.
    async fn attempt(&mut self) -> Result<u64, EngineError> {
        self.segment.downloaded = 0;
        let result = self.stream_to_temp().await;
        if result.is_err() && self.segment.downloaded > 0 {
            self.stats.retract(self.segment.downloaded);
            self.segment.downloaded = 0;
        }
        result.map(|()| self.segment.downloaded)
    }

    async fn stream_to_temp(&mut self) -> Result<(), EngineError> {
        let mut request = self.client.get(&self.url);
        if self.ranged {
            request = request.header(
                header::RANGE,
                format!("bytes={}-{}", self.segment.start, self.segment.end),
            );
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::PARTIAL_CONTENT {
            return Err(EngineError::ServerError {
                status: status.as_u16(),
            });
        }

        // Truncate-and-restart: every attempt recreates the file
        let mut file = File::create(&self.temp_path).await?;
        let mut stream = response.bytes_stream();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!(segment = self.segment.index, "segment cancelled");
                    return Err(EngineError::Cancelled);
                }
                chunk = stream.next() => {
                    let Some(chunk) = chunk else { break };
                    let chunk = chunk?;
                    file.write_all(&chunk).await?;
                    let len = chunk.len() as u64;
                    self.segment.downloaded += len;
                    self.stats.add_downloaded(len);
                }
            }
        }

        file.flush().await?;

        // A clean EOF short of the requested range is still a failed
        // attempt; some servers drop connections without erroring the
        // stream.
        if self.ranged
            && !self.segment.is_unknown_size()
            && self.segment.downloaded != self.segment.size()
        {
            return Err(EngineError::SegmentTruncated {
                index: self.segment.index,
                expected: self.segment.size(),
                written: self.segment.downloaded,
            });
        }

        Ok(())
    }
}
