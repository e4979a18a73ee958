//! Transfer orchestration
//!
//! Drives one transfer end to end: probe, segment planning, parallel
//! segment fetches behind a join barrier, then the merge. Owns the
//! transfer's HTTP client, shared stats, and cancellation token.

use crate::client::build_client;
use crate::engine::merge::merge_segments;
use crate::engine::probe::probe;
use crate::engine::segment_worker::SegmentWorker;
use crate::engine::segments::plan_segments;
use crate::error::EngineError;
use crate::progress::TransferStats;
use reqwest::Client;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use warpdl_types::{HttpSettings, Segment, TransferConfig};

/// A single segmented transfer.
///
/// Construct, hand [`Transfer::stats`] to a renderer and
/// [`Transfer::cancel_token`] to signal wiring, then [`Transfer::run`].
/// The instance is consumed by one transfer; state never outlives it.
#[derive(Debug)]
pub struct Transfer {
    config: TransferConfig,
    settings: HttpSettings,
    client: Client,
    stats: Arc<TransferStats>,
    cancel: CancellationToken,
}

impl Transfer {
    /// Create a transfer with default HTTP settings.
    pub fn new(config: TransferConfig) -> Result<Self, EngineError> {
        Self::with_settings(config, HttpSettings::default())
    }

    /// Create a transfer with explicit HTTP settings (tests point these
    /// at fake origin and DoH servers).
    pub fn with_settings(
        config: TransferConfig,
        settings: HttpSettings,
    ) -> Result<Self, EngineError> {
        url::Url::parse(&config.url).map_err(|_| EngineError::InvalidUrl(config.url.clone()))?;
        if config.concurrency == 0 {
            return Err(EngineError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let client = build_client(&config, &settings)?;
        Ok(Self {
            config,
            settings,
            client,
            stats: Arc::new(TransferStats::new()),
            cancel: CancellationToken::new(),
        })
    }

    /// Shared progress counter, safe to poll from any task at any time.
    pub fn stats(&self) -> Arc<TransferStats> {
        self.stats.clone()
    }

    /// Cancellation token shared by every in-flight segment task.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the transfer to completion.
    ///
    /// Every segment task is always joined before this returns; when
    /// several segments fail terminally, the failure with the smallest
    /// segment index is reported. External cancellation outranks any
    /// segment failure.
    pub async fn run(&self) -> Result<(), EngineError> {
        let probed = probe(&self.client, &self.config.url).await?;
        let resumable = probed.resumable && probed.size.unwrap_or(0) > 0;
        if let Some(size) = probed.size {
            self.stats.set_total(size);
        }

        let output = self.config.output_path();
        let segments = plan_segments(probed.size, resumable, self.config.concurrency);
        info!(
            url = %self.config.url,
            output = %output.display(),
            ?probed,
            segments = segments.len(),
            "starting transfer"
        );

        self.fetch_segments(&segments, resumable, &output).await?;

        merge_segments(&segments, &output).await?;

        // Unknown-length single-segment transfers learn their size only
        // once the stream ends
        if self.stats.total().is_none() {
            self.stats.set_total(self.stats.downloaded());
        }

        info!(output = %output.display(), bytes = self.stats.downloaded(), "transfer complete");
        Ok(())
    }

    /// Fetch all segments in parallel and join every task before
    /// inspecting outcomes, so no task outlives the call.
    async fn fetch_segments(
        &self,
        segments: &[Segment],
        ranged: bool,
        output: &std::path::Path,
    ) -> Result<(), EngineError> {
        let mut join_set = JoinSet::new();
        for segment in segments {
            let worker = SegmentWorker::new(
                segment.clone(),
                self.config.url.clone(),
                output,
                ranged,
                self.client.clone(),
                self.stats.clone(),
                self.cancel.clone(),
                self.settings.max_attempts,
            );
            let index = segment.index;
            join_set.spawn(async move { (index, worker.run().await) });
        }

        let mut cancelled = false;
        let mut failures: Vec<(u32, EngineError)> = Vec::new();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((_, Ok(_))) => {}
                Ok((index, Err(err))) if err.is_cancelled() => {
                    info!(segment = index, "segment cancelled");
                    cancelled = true;
                }
                Ok((index, Err(err))) => {
                    error!(segment = index, error = %err, "segment failed terminally");
                    failures.push((index, err));
                }
                Err(join_err) => {
                    error!(error = %join_err, "segment task panicked");
                    failures.push((
                        u32::MAX,
                        EngineError::InvalidConfig(format!("segment task panicked: {join_err}")),
                    ));
                }
            }
        }

        if cancelled || self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        // Deterministic selection: lowest segment index wins
        failures.sort_by_key(|(index, _)| *index);
        match failures.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }
}
