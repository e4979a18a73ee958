//! HTTP client construction
//!
//! One client serves every engine request for a transfer: the probe and
//! all segment fetches. No overall request timeout is set; a transfer
//! is bounded only by the connect timeout and cancellation.

use crate::error::EngineError;
use crate::resolver::DohResolver;
use reqwest::Client;
use std::sync::Arc;
use warpdl_types::{HttpSettings, TransferConfig};

/// Build the origin client for a transfer.
///
/// TLS certificate verification is controlled solely by
/// `config.insecure_tls`; switching DNS strategies never changes it.
pub fn build_client(
    config: &TransferConfig,
    settings: &HttpSettings,
) -> Result<Client, EngineError> {
    let mut builder = Client::builder()
        .user_agent(&settings.user_agent)
        .connect_timeout(settings.connect_timeout)
        .tcp_keepalive(settings.tcp_keepalive)
        .danger_accept_invalid_certs(config.insecure_tls);

    if config.use_doh {
        // A proxy would resolve hostnames itself and the DoH answer
        // would never be used, so DoH mode dials origins directly
        builder = builder
            .dns_resolver(Arc::new(DohResolver::new(settings)?))
            .no_proxy();
    }

    Ok(builder.build()?)
}
