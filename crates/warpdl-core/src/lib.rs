//! warpdl Core - Download Engine
//!
//! This crate implements the segmented download pipeline: probe,
//! segment planning, parallel ranged fetches with bounded retry, and
//! merge, plus the DNS-over-HTTPS resolving transport used for every
//! outbound origin request.

mod client;
mod engine;
mod error;
mod progress;
mod resolver;

pub use client::*;
pub use engine::*;
pub use error::*;
pub use progress::*;
pub use resolver::*;

pub use warpdl_types::{HttpSettings, ProbeInfo, Segment, TransferConfig};
