//! Resource probing
//!
//! Learns the total size and range-request support before the engine
//! commits to a fetch plan. HEAD alone is not trustworthy: plenty of
//! servers omit or misreport `Accept-Ranges` on HEAD yet honor an
//! explicit ranged GET, so a one-byte ranged GET is the fallback.

use crate::error::EngineError;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, info};
use warpdl_types::ProbeInfo;

/// Probe `url` for total size and range support.
///
/// Any outcome other than a successful HEAD, a 206, or a 200 on the
/// ranged GET is a fatal probe error.
pub async fn probe(client: &Client, url: &str) -> Result<ProbeInfo, EngineError> {
    match client.head(url).send().await {
        Ok(response) if response.status().is_success() => {
            let size = header_content_length(&response);
            let resumable = response
                .headers()
                .get(header::ACCEPT_RANGES)
                .and_then(|v| v.to_str().ok())
                .map(|v| v == "bytes")
                .unwrap_or(false);
            debug!(?size, resumable, "HEAD probe succeeded");
            return Ok(ProbeInfo { size, resumable });
        }
        Ok(response) => {
            debug!(status = %response.status(), "HEAD rejected, falling back to ranged GET");
        }
        Err(err) => {
            debug!(error = %err, "HEAD failed, falling back to ranged GET");
        }
    }

    let response = client
        .get(url)
        .header(header::RANGE, "bytes=0-0")
        .send()
        .await?;

    match response.status() {
        StatusCode::PARTIAL_CONTENT => {
            // Content-Range: bytes 0-0/123456 ("*" means unknown)
            let size = response
                .headers()
                .get(header::CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.rsplit('/').next())
                .filter(|total| *total != "*")
                .and_then(|total| total.parse::<u64>().ok());
            info!(?size, "ranged GET probe confirmed range support");
            Ok(ProbeInfo {
                size,
                resumable: true,
            })
        }
        StatusCode::OK => {
            // Server ignored the range request and sent the full body
            let size = header_content_length(&response);
            info!(?size, "server ignored range request");
            Ok(ProbeInfo {
                size,
                resumable: false,
            })
        }
        status => Err(EngineError::Probe {
            status: status.as_u16(),
        }),
    }
}

/// Read `Content-Length` from the headers rather than the body hint, so
/// HEAD responses report the declared resource size.
fn header_content_length(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .filter(|len| *len > 0)
}
