//! Domain label validation and small domain-string helpers.
//!
//! The validity rule is deliberately narrow: it only rejects the hyphen
//! placements registries refuse outright, so that generated candidates are
//! pruned before a probe is wasted on them.

use crate::error::DomainSweepError;

/// Check a single dot-delimited label.
///
/// A label is invalid when it starts with `-`, ends with `-`, or contains
/// `--` anywhere. Everything else passes, including the empty label.
pub fn is_valid_label(label: &str) -> bool {
    !(label.starts_with('-') || label.ends_with('-') || label.contains("--"))
}

/// Check every dot-delimited label of a domain with [`is_valid_label`].
pub fn is_valid_domain(domain: &str) -> bool {
    domain.split('.').all(is_valid_label)
}

/// Extract the TLD (last label, lowercased) from a domain name.
///
/// Multi-level public suffixes are not recognised: `example.co.uk` yields `uk`.
pub fn extract_tld(domain: &str) -> Result<String, DomainSweepError> {
    let domain = domain.trim().trim_end_matches('.');
    match domain.rsplit_once('.') {
        Some((_, tld)) if !tld.is_empty() => Ok(tld.to_lowercase()),
        _ => Err(DomainSweepError::invalid_domain(
            domain,
            "Domain must contain at least one dot",
        )),
    }
}

/// Clean up explicitly supplied domains: trim whitespace, drop empty entries.
pub fn normalize_domain_inputs<I, S>(domains: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    domains
        .into_iter()
        .map(|d| d.as_ref().trim().to_string())
        .filter(|d| !d.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_label() {
        assert!(is_valid_label("ab"));
        assert!(is_valid_label("a-b"));
        assert!(is_valid_label("a"));
        assert!(is_valid_label(""));

        assert!(!is_valid_label("-ab"));
        assert!(!is_valid_label("ab-"));
        assert!(!is_valid_label("a--b"));
        assert!(!is_valid_label("-"));
    }

    #[test]
    fn test_is_valid_domain() {
        assert!(is_valid_domain("ab.app"));
        assert!(is_valid_domain("a-b.app"));
        assert!(is_valid_domain("sub.a-b.app"));

        assert!(!is_valid_domain("a--b.app"));
        assert!(!is_valid_domain("-ab.app"));
        assert!(!is_valid_domain("ab-.app"));
        assert!(!is_valid_domain("ab.-app"));
    }

    #[test]
    fn test_extract_tld() {
        assert_eq!(extract_tld("example.com").unwrap(), "com");
        assert_eq!(extract_tld("ab.APP").unwrap(), "app");
        assert_eq!(extract_tld("sub.example.co.uk").unwrap(), "uk");
        assert_eq!(extract_tld("example.com.").unwrap(), "com");
        assert!(extract_tld("invalid").is_err());
        assert!(extract_tld("").is_err());
    }

    #[test]
    fn test_normalize_domain_inputs() {
        let domains = vec!["  ab.app ", "", "   ", "cd.dev"];
        assert_eq!(normalize_domain_inputs(domains), vec!["ab.app", "cd.dev"]);
    }
}
