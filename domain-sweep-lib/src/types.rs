//! Core data types for domain sweeping.
//!
//! This module defines the run configuration, the probe options handed to the
//! transports, and the result records emitted for every dispatched candidate.

use crate::error::DomainSweepError;
use crate::parser::WhoisRecord;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Probe protocol used for every candidate of a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ProbeMethod {
    /// Port-43 WHOIS query, parsed into a structured record
    #[default]
    #[serde(rename = "whois")]
    Whois,

    /// HTTP HEAD request against the bare hostname
    #[serde(rename = "http", alias = "curl")]
    Http,
}

impl FromStr for ProbeMethod {
    type Err = DomainSweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "whois" => Ok(ProbeMethod::Whois),
            // `curl` is kept as an alias for scripts written against older releases
            "http" | "curl" => Ok(ProbeMethod::Http),
            other => Err(DomainSweepError::config(format!(
                "Invalid method '{}', should be one of whois, http, curl",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeMethod::Whois => write!(f, "whois"),
            ProbeMethod::Http => write!(f, "http"),
        }
    }
}

/// SOCKS protocol version of a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyKind {
    #[serde(rename = "socks4")]
    Socks4,
    #[serde(rename = "socks5")]
    Socks5,
}

impl std::fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyKind::Socks4 => write!(f, "socks4"),
            ProxyKind::Socks5 => write!(f, "socks5"),
        }
    }
}

/// Routing descriptor for WHOIS connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub kind: ProxyKind,
}

impl ProxyConfig {
    /// Parse a proxy URL of the form `socks5://host:port` or `socks4://host:port`.
    ///
    /// Any other scheme, a missing scheme, or a missing/invalid port is a
    /// `ConfigError`. IPv6 hosts must be bracketed (`socks5://[::1]:1080`).
    pub fn parse(url: &str) -> Result<Self, DomainSweepError> {
        let url = url.trim();
        let (scheme, rest) = url.split_once("://").ok_or_else(|| {
            DomainSweepError::config(format!(
                "Invalid proxy '{}', expected socks4://host:port or socks5://host:port",
                url
            ))
        })?;

        let kind = match scheme.to_lowercase().as_str() {
            "socks4" => ProxyKind::Socks4,
            "socks5" => ProxyKind::Socks5,
            other => {
                return Err(DomainSweepError::config(format!(
                    "Invalid proxy protocol ({}), should be one of socks5, socks4",
                    other
                )))
            }
        };

        let authority = rest.trim_end_matches('/');
        let (host, port) = authority.rsplit_once(':').ok_or_else(|| {
            DomainSweepError::config(format!("Proxy '{}' is missing a port", url))
        })?;

        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(DomainSweepError::config(format!(
                "Proxy '{}' is missing a host",
                url
            )));
        }

        let port = port.parse::<u16>().map_err(|_| {
            DomainSweepError::config(format!("Invalid proxy port '{}' in '{}'", port, url))
        })?;

        Ok(Self {
            host: host.to_string(),
            port,
            kind,
        })
    }

    /// `host:port` form accepted by socket address resolution.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl std::fmt::Display for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.kind, self.address())
    }
}

/// Options passed to the WHOIS transport for every query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Registry server override; when unset the server is resolved per TLD
    pub server: Option<String>,

    /// SOCKS proxy to tunnel WHOIS connections through
    pub proxy: Option<ProxyConfig>,
}

/// Key normalization applied while parsing WHOIS text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Fold keys to lowercase
    pub lowercase: bool,

    /// Split multi-word keys on spaces into a nested path
    pub nested: bool,
}

/// Immutable configuration for a sweep run.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Probe protocol
    /// Default: whois
    pub method: ProbeMethod,

    /// Maximum number of candidates pulled (and probed concurrently) per batch
    /// Default: 1000
    pub batch_size: usize,

    /// Resume marker; candidates before it are never probed
    pub start_from: Option<String>,

    /// Server override and proxy for WHOIS
    pub probe_options: ProbeOptions,

    /// Deadline applied by the transports to each probe
    /// Default: 10 seconds
    pub timeout: Duration,

    /// WHOIS key normalization
    pub parse_options: ParseOptions,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            method: ProbeMethod::Whois,
            batch_size: 1000,
            start_from: None,
            probe_options: ProbeOptions::default(),
            timeout: Duration::from_secs(10),
            parse_options: ParseOptions::default(),
        }
    }
}

impl SweepConfig {
    pub fn with_method(mut self, method: ProbeMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_start_from<S: Into<String>>(mut self, domain: S) -> Self {
        self.start_from = Some(domain.into());
        self
    }

    pub fn with_whois_server<S: Into<String>>(mut self, server: S) -> Self {
        self.probe_options.server = Some(server.into());
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.probe_options.proxy = Some(proxy);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_parse_options(mut self, parse_options: ParseOptions) -> Self {
        self.parse_options = parse_options;
        self
    }

    /// Reject settings that would make a run meaningless.
    pub fn validate(&self) -> Result<(), DomainSweepError> {
        if self.batch_size == 0 {
            return Err(DomainSweepError::config("Batch size must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(DomainSweepError::config("Timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Status line of an HTTP probe as reported by the HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpStatus {
    pub status_code: u16,
    pub method: String,
}

/// Result of an HTTP HEAD probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpProbeRecord {
    pub domain: String,
    pub status_code: u16,
    pub method: String,
}

/// A probe that could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeError {
    pub domain: String,
    pub error_message: String,
}

/// Which output stream a result belongs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChannel {
    /// Registered-looking WHOIS records and HTTP responses
    Primary,

    /// WHOIS placeholders without delegation data, and probe errors
    Secondary,
}

/// Exactly one of these is emitted per dispatched candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProbeResult {
    Whois(WhoisRecord),
    Http(HttpProbeRecord),
    Error(ProbeError),
}

impl ProbeResult {
    /// The candidate this result belongs to.
    pub fn domain(&self) -> &str {
        match self {
            ProbeResult::Whois(record) => record.domain().unwrap_or_default(),
            ProbeResult::Http(record) => &record.domain,
            ProbeResult::Error(err) => &err.domain,
        }
    }

    /// Route the result to an output channel.
    ///
    /// WHOIS servers answer unregistered names with an ordinary text body, so
    /// a populated DNSSEC field is taken as the sign of a live delegation.
    pub fn channel(&self) -> OutputChannel {
        match self {
            ProbeResult::Whois(record) if record.has_dnssec() => OutputChannel::Primary,
            ProbeResult::Whois(_) => OutputChannel::Secondary,
            ProbeResult::Http(_) => OutputChannel::Primary,
            ProbeResult::Error(_) => OutputChannel::Secondary,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ProbeResult::Error(_))
    }

    /// Serialize as a single JSON line.
    pub fn to_json_line(&self) -> Result<String, DomainSweepError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Counters collected over a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Candidates pulled from the input sequence
    pub seen: usize,
    /// Skipped because the resume marker had not been reached yet
    pub skipped_before_cursor: usize,
    /// Skipped because a label was malformed
    pub skipped_invalid: usize,
    /// Skipped because the candidate was in the exclusion set
    pub skipped_excluded: usize,
    /// Probes actually sent
    pub dispatched: usize,
    /// Results routed to the primary channel
    pub primary: usize,
    /// Results routed to the secondary channel
    pub secondary: usize,
    /// Of the secondary results, how many were probe errors
    pub errors: usize,
    /// Batches that dispatched at least one probe
    pub batches: usize,
}

impl RunSummary {
    pub(crate) fn record(&mut self, result: &ProbeResult) {
        match result.channel() {
            OutputChannel::Primary => self.primary += 1,
            OutputChannel::Secondary => self.secondary += 1,
        }
        if result.is_error() {
            self.errors += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_method_from_str() {
        assert_eq!("whois".parse::<ProbeMethod>().unwrap(), ProbeMethod::Whois);
        assert_eq!("HTTP".parse::<ProbeMethod>().unwrap(), ProbeMethod::Http);
        assert_eq!("curl".parse::<ProbeMethod>().unwrap(), ProbeMethod::Http);
        assert!("dns".parse::<ProbeMethod>().is_err());
    }

    #[test]
    fn test_proxy_parse_socks5() {
        let proxy = ProxyConfig::parse("socks5://127.0.0.1:1080").unwrap();
        assert_eq!(proxy.host, "127.0.0.1");
        assert_eq!(proxy.port, 1080);
        assert_eq!(proxy.kind, ProxyKind::Socks5);
        assert_eq!(proxy.address(), "127.0.0.1:1080");
    }

    #[test]
    fn test_proxy_parse_socks4_and_ipv6() {
        let proxy = ProxyConfig::parse("socks4://[::1]:9050").unwrap();
        assert_eq!(proxy.host, "::1");
        assert_eq!(proxy.kind, ProxyKind::Socks4);
        assert_eq!(proxy.address(), "[::1]:9050");
        assert_eq!(proxy.to_string(), "socks4://[::1]:9050");
    }

    #[test]
    fn test_proxy_parse_rejects_other_schemes() {
        let err = ProxyConfig::parse("http://127.0.0.1:8080").unwrap_err();
        assert!(matches!(err, DomainSweepError::ConfigError { .. }));
        assert!(err.to_string().contains("Invalid proxy protocol (http)"));

        assert!(ProxyConfig::parse("127.0.0.1:1080").is_err());
        assert!(ProxyConfig::parse("socks5://127.0.0.1").is_err());
        assert!(ProxyConfig::parse("socks5://127.0.0.1:notaport").is_err());
        assert!(ProxyConfig::parse("socks5://:1080").is_err());
    }

    #[test]
    fn test_sweep_config_validation() {
        assert!(SweepConfig::default().validate().is_ok());
        assert!(SweepConfig::default()
            .with_batch_size(0)
            .validate()
            .is_err());
        assert!(SweepConfig::default()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_http_record_serializes_camel_case() {
        let result = ProbeResult::Http(HttpProbeRecord {
            domain: "ab.app".to_string(),
            status_code: 301,
            method: "HEAD".to_string(),
        });
        assert_eq!(
            result.to_json_line().unwrap(),
            r#"{"domain":"ab.app","statusCode":301,"method":"HEAD"}"#
        );
        assert_eq!(result.channel(), OutputChannel::Primary);
    }

    #[test]
    fn test_error_record_goes_to_secondary() {
        let result = ProbeResult::Error(ProbeError {
            domain: "ab.app".to_string(),
            error_message: "connection refused".to_string(),
        });
        assert_eq!(
            result.to_json_line().unwrap(),
            r#"{"domain":"ab.app","errorMessage":"connection refused"}"#
        );
        assert_eq!(result.channel(), OutputChannel::Secondary);
        assert_eq!(result.domain(), "ab.app");
    }
}
