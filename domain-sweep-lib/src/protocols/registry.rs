//! WHOIS server mappings and IANA referral cache.
//!
//! Servers for common TLDs are built in. Anything else is discovered once per
//! process through a referral query to `whois.iana.org` and cached, including
//! negative answers.

use crate::error::DomainSweepError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

/// Root WHOIS server used for referral discovery.
pub const IANA_WHOIS_SERVER: &str = "whois.iana.org";

/// Google Registry server (`.app`, `.dev`, `.page`, ...).
pub const GOOGLE_WHOIS_SERVER: &str = "whois.nic.google";

// TLD -> WHOIS server discovered via IANA referral; "" marks "no server"
lazy_static::lazy_static! {
    static ref WHOIS_SERVER_CACHE: Mutex<HashMap<String, String>> = Mutex::new(HashMap::new());
    static ref REFERRAL_LOCKS: Mutex<HashMap<String, Arc<AsyncMutex<()>>>> = Mutex::new(HashMap::new());
}

/// Get the built-in WHOIS server mappings.
pub fn get_whois_server_map() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        // Verisign
        ("com", "whois.verisign-grs.com"),
        ("net", "whois.verisign-grs.com"),
        ("cc", "ccwhois.verisign-grs.com"),
        ("tv", "whois.nic.tv"),
        // Public Interest Registry
        ("org", "whois.pir.org"),
        // Google Registry
        ("app", GOOGLE_WHOIS_SERVER),
        ("dev", GOOGLE_WHOIS_SERVER),
        ("page", GOOGLE_WHOIS_SERVER),
        ("new", GOOGLE_WHOIS_SERVER),
        ("how", GOOGLE_WHOIS_SERVER),
        ("soy", GOOGLE_WHOIS_SERVER),
        // Identity Digital
        ("io", "whois.nic.io"),
        ("ai", "whois.nic.ai"),
        ("me", "whois.nic.me"),
        ("info", "whois.nic.info"),
        // Others
        ("co", "whois.nic.co"),
        ("xyz", "whois.nic.xyz"),
        ("biz", "whois.nic.biz"),
    ])
}

/// Look up a built-in WHOIS server for a TLD.
pub fn builtin_whois_server(tld: &str) -> Option<&'static str> {
    get_whois_server_map().get(tld.to_lowercase().as_str()).copied()
}

/// Cache a discovered WHOIS server for a TLD (`""` caches a miss).
pub fn cache_whois_server(tld: &str, server: &str) -> Result<(), DomainSweepError> {
    let mut cache = WHOIS_SERVER_CACHE
        .lock()
        .map_err(|_| DomainSweepError::internal("Failed to acquire WHOIS cache lock for writing"))?;

    cache.insert(tld.to_lowercase(), server.to_string());
    Ok(())
}

/// Cached lookup result for a TLD.
///
/// `None` means the TLD was never looked up, `Some(None)` that the lookup
/// found no server.
pub fn get_cached_whois_server(tld: &str) -> Option<Option<String>> {
    let cache = WHOIS_SERVER_CACHE.lock().ok()?;
    let server = cache.get(&tld.to_lowercase())?;
    if server.is_empty() {
        Some(None)
    } else {
        Some(Some(server.clone()))
    }
}

/// Lock serializing referral lookups for one TLD.
///
/// Hold it across cache check, lookup and insert so that concurrent probes
/// of an unknown TLD send a single referral query between them.
pub fn referral_lock(tld: &str) -> Result<Arc<AsyncMutex<()>>, DomainSweepError> {
    let mut locks = REFERRAL_LOCKS
        .lock()
        .map_err(|_| DomainSweepError::internal("Failed to acquire WHOIS referral lock table"))?;
    Ok(locks.entry(tld.to_lowercase()).or_default().clone())
}

/// Parse an IANA WHOIS response for the authoritative WHOIS server.
///
/// IANA answers with either `refer:` or `whois:`; `refer:` wins when both
/// are present.
///
/// ```text
/// refer:        whois.nic.google
/// domain:       APP
/// whois:        whois.nic.google
/// ```
pub fn parse_iana_refer_response(response: &str) -> Option<String> {
    let mut whois_server = None;

    for line in response.lines() {
        let line_trimmed = line.trim();
        if let Some(server) = line_trimmed.strip_prefix("refer:") {
            let server = server.trim();
            if !server.is_empty() {
                return Some(server.to_string());
            }
        } else if let Some(server) = line_trimmed.strip_prefix("whois:") {
            let server = server.trim();
            if !server.is_empty() {
                whois_server = Some(server.to_string());
            }
        }
    }

    whois_server
}
