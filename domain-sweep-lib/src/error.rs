//! Error handling for domain sweeping operations.
//!
//! Only two kinds of failure matter to a sweep: configuration problems, which
//! abort the run before anything is dispatched, and transport problems, which
//! are turned into per-candidate error records by the runner. Malformed WHOIS
//! text is deliberately not an error.

use std::fmt;
use std::time::Duration;

/// Main error type for domain sweeping operations.
#[derive(Debug, Clone)]
pub enum DomainSweepError {
    /// Domain name that cannot be used for a lookup
    InvalidDomain { domain: String, reason: String },

    /// Network, WHOIS or HTTP failure while probing a single candidate
    TransportError { domain: String, message: String },

    /// A transport operation exceeded its deadline
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Invalid settings (proxy scheme, empty charset, batch size, ...)
    ConfigError { message: String },

    /// File I/O errors when reading exclusion or candidate lists
    FileError { path: String, message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl DomainSweepError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new transport error for a candidate.
    pub fn transport<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::TransportError {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error must stop a run before any probe is dispatched.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigError { .. } | Self::FileError { .. })
    }

    /// Short message suitable for the `errorMessage` field of a result line.
    pub fn probe_message(&self) -> String {
        match self {
            Self::TransportError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for DomainSweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::TransportError { domain, message } => {
                write!(f, "Transport error for '{}': {}", domain, message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for DomainSweepError {}

// The conversions below lose the candidate name; transports that know it
// should build `DomainSweepError::transport` directly.
impl From<reqwest::Error> for DomainSweepError {
    fn from(err: reqwest::Error) -> Self {
        let domain = err
            .url()
            .and_then(|u| u.host_str())
            .unwrap_or("unknown")
            .to_string();
        if err.is_connect() {
            Self::transport(domain, format!("Connection failed: {}", err))
        } else {
            Self::transport(domain, format!("HTTP request failed: {}", err))
        }
    }
}

impl From<tokio_socks::Error> for DomainSweepError {
    fn from(err: tokio_socks::Error) -> Self {
        Self::transport("unknown", format!("SOCKS proxy error: {}", err))
    }
}

impl From<serde_json::Error> for DomainSweepError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization failed: {}", err),
        }
    }
}

impl From<std::io::Error> for DomainSweepError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = DomainSweepError::transport("ab.app", "connection refused");
        assert_eq!(
            err.to_string(),
            "Transport error for 'ab.app': connection refused"
        );

        let err = DomainSweepError::config("Invalid proxy protocol (http)");
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid proxy protocol (http)"
        );
    }

    #[test]
    fn test_probe_message_strips_domain_prefix() {
        let err = DomainSweepError::transport("ab.app", "connection refused");
        assert_eq!(err.probe_message(), "connection refused");

        let err = DomainSweepError::timeout("WHOIS query", Duration::from_secs(10));
        assert!(err.probe_message().contains("WHOIS query"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(DomainSweepError::config("bad").is_fatal());
        assert!(DomainSweepError::file_error("x.jsonl", "missing").is_fatal());
        assert!(!DomainSweepError::transport("a.app", "reset").is_fatal());
        assert!(!DomainSweepError::timeout("HTTP probe", Duration::from_secs(1)).is_fatal());
    }
}
