//! DNS-over-HTTPS resolver
//!
//! Plugs into `reqwest` as a custom [`Resolve`] implementation so every
//! origin connection resolves hostnames through a DoH provider's JSON
//! API instead of system DNS. Literal IP targets skip the query and are
//! dialed directly.
//!
//! The resolver keeps its own bootstrap HTTP client which uses ordinary
//! system resolution; the provider's hostname has to stay reachable or
//! nothing else is.

use crate::error::EngineError;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;
use tracing::debug;
use warpdl_types::HttpSettings;

/// A-record query type in the DNS wire format
const TYPE_A: u16 = 1;

/// Errors from a single DoH lookup
#[derive(Debug, Error)]
pub enum DohError {
    #[error("DoH query failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("DoH provider returned status {0}")]
    Provider(u16),

    #[error("DNS error code {0}")]
    Rcode(u32),

    #[error("no DNS answer found for {0}")]
    NoAnswer(String),

    #[error("no A record found for {0}")]
    NoARecord(String),
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "type")]
    record_type: u16,
    data: String,
}

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Status")]
    status: u32,
    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

/// Resolves hostnames via a DoH provider's `application/dns-json` API.
#[derive(Debug, Clone)]
pub struct DohResolver {
    endpoint: String,
    bootstrap: reqwest::Client,
}

impl DohResolver {
    /// Build a resolver against the configured provider endpoint.
    ///
    /// The bootstrap client gets its own short timeout; a slow provider
    /// must not stall origin dials indefinitely.
    pub fn new(settings: &HttpSettings) -> Result<Self, EngineError> {
        let bootstrap = reqwest::Client::builder()
            .user_agent(&settings.user_agent)
            .timeout(settings.doh_timeout)
            .build()?;

        Ok(Self {
            endpoint: settings.doh_endpoint.clone(),
            bootstrap,
        })
    }

    /// Query the provider for the first IPv4 address of `host`.
    pub async fn lookup(&self, host: &str) -> Result<IpAddr, DohError> {
        let response = self
            .bootstrap
            .get(&self.endpoint)
            .query(&[("name", host), ("type", "A")])
            .header(reqwest::header::ACCEPT, "application/dns-json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DohError::Provider(status.as_u16()));
        }

        let answer: DohResponse = response.json().await?;
        if answer.status != 0 {
            return Err(DohError::Rcode(answer.status));
        }
        if answer.answer.is_empty() {
            return Err(DohError::NoAnswer(host.to_string()));
        }

        answer
            .answer
            .iter()
            .find(|a| a.record_type == TYPE_A)
            .and_then(|a| a.data.parse::<IpAddr>().ok())
            .ok_or_else(|| DohError::NoARecord(host.to_string()))
    }
}

impl Resolve for DohResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.clone();
        Box::pin(async move {
            let host = name.as_str();

            // Literal IPs bypass DoH and dial directly
            if let Ok(ip) = host.parse::<IpAddr>() {
                let addrs: Addrs = Box::new(std::iter::once(SocketAddr::new(ip, 0)));
                return Ok(addrs);
            }

            let ip = resolver.lookup(host).await?;
            debug!(host, %ip, "resolved via DoH");

            let addrs: Addrs = Box::new(std::iter::once(SocketAddr::new(ip, 0)));
            Ok(addrs)
        })
    }
}
