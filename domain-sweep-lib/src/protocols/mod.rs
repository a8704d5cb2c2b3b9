//! Probe transports.
//!
//! The runner only talks to the two traits below, so tests can substitute
//! in-memory transports for the network ones.

/// HTTP HEAD probe
pub mod http;

/// Port-43 WHOIS client
pub mod whois;

/// WHOIS server table and referral cache
pub mod registry;

use crate::error::DomainSweepError;
use crate::types::{HttpStatus, ProbeOptions};
use async_trait::async_trait;

/// Fetches raw WHOIS text for a domain.
#[async_trait]
pub trait WhoisTransport: Send + Sync {
    async fn query(&self, domain: &str, options: &ProbeOptions) -> Result<String, DomainSweepError>;
}

/// Issues an HTTP request against a bare hostname.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn probe(&self, hostname: &str) -> Result<HttpStatus, DomainSweepError>;
}

pub use http::HttpProber;
pub use registry::{get_whois_server_map, parse_iana_refer_response};
pub use whois::WhoisClient;
