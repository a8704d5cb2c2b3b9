//! HTTP HEAD probe.
//!
//! A registered name usually has something answering on port 80, so the
//! status line of a single HEAD request is a cheap liveness signal. Redirects
//! are reported as-is rather than followed.

use super::HttpTransport;
use crate::error::DomainSweepError;
use crate::types::HttpStatus;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use std::time::Duration;

const PROBE_METHOD: &str = "HEAD";

/// HTTP client issuing one HEAD request per candidate.
#[derive(Clone)]
pub struct HttpProber {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    /// Create a prober with the default 10 second timeout.
    pub fn new() -> Result<Self, DomainSweepError> {
        Self::with_timeout(Duration::from_secs(10))
    }

    /// Create a prober with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, DomainSweepError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .user_agent(concat!("domain-sweep/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                DomainSweepError::internal(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// URL probed for a hostname.
pub fn probe_url(hostname: &str) -> String {
    format!("http://{}/", hostname)
}

#[async_trait]
impl HttpTransport for HttpProber {
    async fn probe(&self, hostname: &str) -> Result<HttpStatus, DomainSweepError> {
        let response = self
            .http_client
            .head(probe_url(hostname))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DomainSweepError::timeout("HTTP probe", self.timeout)
                } else {
                    DomainSweepError::transport(hostname, e.to_string())
                }
            })?;

        Ok(HttpStatus {
            status_code: response.status().as_u16(),
            method: PROBE_METHOD.to_string(),
        })
    }
}
