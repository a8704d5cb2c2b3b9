//! Port-43 WHOIS client.
//!
//! Queries go straight to the registry over TCP, optionally tunnelled through
//! a SOCKS4 or SOCKS5 proxy. The raw response text is returned untouched;
//! turning it into a record is the parser's job.

use super::registry::{
    builtin_whois_server, cache_whois_server, get_cached_whois_server, parse_iana_refer_response,
    referral_lock, IANA_WHOIS_SERVER,
};
use super::WhoisTransport;
use crate::error::DomainSweepError;
use crate::types::{ProbeOptions, ProxyConfig, ProxyKind};
use crate::utils::extract_tld;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_socks::tcp::{Socks4Stream, Socks5Stream};

/// Well-known WHOIS port.
pub const WHOIS_PORT: u16 = 43;

/// WHOIS client speaking the wire protocol directly.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    /// Deadline for one query, including server discovery
    timeout: Duration,
    /// Host and port asked for referrals when a TLD has no known server
    referral_server: (String, u16),
}

impl WhoisClient {
    /// Create a new WHOIS client with default settings.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(10))
    }

    /// Create a new WHOIS client with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            referral_server: (IANA_WHOIS_SERVER.to_string(), WHOIS_PORT),
        }
    }

    /// Ask `host:port` for TLD referrals instead of IANA.
    pub fn with_referral_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.referral_server = (host.into(), port);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Pick the server for a domain: explicit override, built-in table, then
    /// an IANA referral (cached per TLD, misses included).
    pub async fn resolve_server(
        &self,
        domain: &str,
        options: &ProbeOptions,
    ) -> Result<String, DomainSweepError> {
        if let Some(server) = &options.server {
            return Ok(server.clone());
        }

        let tld = extract_tld(domain)?;
        if let Some(server) = builtin_whois_server(&tld) {
            return Ok(server.to_string());
        }

        let discovered = match get_cached_whois_server(&tld) {
            Some(cached) => cached,
            None => self.discover_server(domain, &tld, options).await?,
        };

        discovered.ok_or_else(|| {
            DomainSweepError::transport(domain, format!("No WHOIS server known for .{}", tld))
        })
    }

    /// Referral lookup for `tld`, at most one in flight per TLD. Whoever waited
    /// on the lock picks up the cached answer instead of asking again.
    async fn discover_server(
        &self,
        domain: &str,
        tld: &str,
        options: &ProbeOptions,
    ) -> Result<Option<String>, DomainSweepError> {
        let lock = referral_lock(tld)?;
        let _guard = lock.lock().await;
        if let Some(cached) = get_cached_whois_server(tld) {
            return Ok(cached);
        }

        let (host, port) = &self.referral_server;
        let response = self
            .send_query(host, *port, tld, options.proxy.as_ref())
            .await
            .map_err(|e| {
                DomainSweepError::transport(
                    domain,
                    format!(
                        "IANA referral lookup for .{} failed: {}",
                        tld,
                        e.probe_message()
                    ),
                )
            })?;
        let server = parse_iana_refer_response(&response);
        tracing::debug!(tld, server = ?server, "IANA referral");
        cache_whois_server(tld, server.as_deref().unwrap_or(""))?;
        Ok(server)
    }

    /// Open a connection to `server`, send `query` and read until the server
    /// closes the connection.
    async fn send_query(
        &self,
        server: &str,
        port: u16,
        query: &str,
        proxy: Option<&ProxyConfig>,
    ) -> Result<String, DomainSweepError> {
        let target = (server, port);
        let result = match proxy {
            None => {
                let mut stream = TcpStream::connect(target).await.map_err(|e| {
                    DomainSweepError::transport(query, format!("connect {}: {}", server, e))
                })?;
                exchange(&mut stream, query).await
            }
            Some(proxy) => match proxy.kind {
                ProxyKind::Socks5 => {
                    let mut stream = Socks5Stream::connect(proxy.address().as_str(), target)
                        .await
                        .map_err(|e| socks_error(query, proxy, e))?;
                    exchange(&mut stream, query).await
                }
                ProxyKind::Socks4 => {
                    let mut stream = Socks4Stream::connect(proxy.address().as_str(), target)
                        .await
                        .map_err(|e| socks_error(query, proxy, e))?;
                    exchange(&mut stream, query).await
                }
            },
        };

        result.map_err(|e| DomainSweepError::transport(query, format!("{}: {}", server, e)))
    }
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WhoisTransport for WhoisClient {
    async fn query(&self, domain: &str, options: &ProbeOptions) -> Result<String, DomainSweepError> {
        let lookup = async {
            let server = self.resolve_server(domain, options).await?;
            tracing::trace!(domain, server = %server, "sending WHOIS query");
            self.send_query(&server, WHOIS_PORT, domain, options.proxy.as_ref())
                .await
        };

        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(DomainSweepError::timeout("WHOIS query", self.timeout)),
        }
    }
}

fn socks_error(query: &str, proxy: &ProxyConfig, err: tokio_socks::Error) -> DomainSweepError {
    DomainSweepError::transport(query, format!("proxy {}: {}", proxy, err))
}

/// Write one CRLF-terminated query and read the reply to EOF.
async fn exchange<S>(stream: &mut S, query: &str) -> std::io::Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(format!("{}\r\n", query).as_bytes()).await?;
    stream.flush().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_exchange_sends_crlf_and_reads_to_eof() {
        let mut stream = tokio_test::io::Builder::new()
            .write(b"ab.app\r\n")
            .read(b"Domain Name: AB.APP\r\n")
            .read(b"DNSSEC: unsigned\r\n")
            .build();

        let response = exchange(&mut stream, "ab.app").await.unwrap();
        assert_eq!(response, "Domain Name: AB.APP\r\nDNSSEC: unsigned\r\n");
    }

    #[tokio::test]
    async fn test_exchange_decodes_lossily() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::spawn(async move {
            let mut sink = [0u8; 4];
            let _ = server.read_exact(&mut sink).await;
            server.write_all(&[b'o', b'k', 0xff]).await.unwrap();
        });

        let response = exchange(&mut client, "x.y").await.unwrap();
        assert!(response.starts_with("ok"));
        assert!(response.contains('\u{fffd}'));
    }

    #[tokio::test]
    async fn test_resolve_prefers_explicit_server() {
        let client = WhoisClient::new();
        let options = ProbeOptions {
            server: Some("whois.example.net".to_string()),
            proxy: None,
        };
        assert_eq!(
            client.resolve_server("ab.app", &options).await.unwrap(),
            "whois.example.net"
        );
    }

    #[tokio::test]
    async fn test_resolve_uses_builtin_table() {
        let client = WhoisClient::new();
        let options = ProbeOptions::default();
        assert_eq!(
            client.resolve_server("ab.dev", &options).await.unwrap(),
            "whois.nic.google"
        );
    }

    #[tokio::test]
    async fn test_resolve_cached_miss_is_an_error() {
        cache_whois_server("nowhoistld", "").unwrap();
        let client = WhoisClient::new();
        let err = client
            .resolve_server("ab.nowhoistld", &ProbeOptions::default())
            .await
            .unwrap_err();
        assert!(err.probe_message().contains("No WHOIS server"));
    }

    #[tokio::test]
    async fn test_exchange_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut line = Vec::new();
            let mut byte = [0u8; 1];
            while socket.read_exact(&mut byte).await.is_ok() {
                line.push(byte[0]);
                if line.ends_with(b"\r\n") {
                    break;
                }
            }
            socket.write_all(&line).await.unwrap();
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let response = exchange(&mut stream, "echo.app").await.unwrap();
        assert_eq!(response, "echo.app\r\n");
    }

    /// Referral server on localhost that answers every query with `refer:`
    /// after a short pause, counting the connections it accepts.
    async fn spawn_referral_server(refer: &'static str) -> (u16, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut byte = [0u8; 1];
                    let mut line = Vec::new();
                    while socket.read_exact(&mut byte).await.is_ok() {
                        line.push(byte[0]);
                        if line.ends_with(b"\r\n") {
                            break;
                        }
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    let reply = format!("refer:        {}\n", refer);
                    let _ = socket.write_all(reply.as_bytes()).await;
                });
            }
        });

        (port, accepted)
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_referral() {
        let (port, accepted) = spawn_referral_server("whois.nic.sharedref").await;
        let client = WhoisClient::new().with_referral_server("127.0.0.1", port);
        let options = ProbeOptions::default();

        let domains: Vec<String> = (0..20).map(|i| format!("n{}.sharedref", i)).collect();
        let resolved = join_all(domains.iter().map(|d| client.resolve_server(d, &options))).await;

        assert_eq!(accepted.load(Ordering::SeqCst), 1);
        for server in resolved {
            assert_eq!(server.unwrap(), "whois.nic.sharedref");
        }
        assert_eq!(
            get_cached_whois_server("sharedref"),
            Some(Some("whois.nic.sharedref".to_string()))
        );
    }

    #[tokio::test]
    async fn test_query_times_out() {
        let client = WhoisClient::with_timeout(Duration::from_millis(1));
        let options = ProbeOptions {
            // Non-routable address, so the connect never completes in time
            server: Some("10.255.255.1".to_string()),
            proxy: None,
        };
        let err = client.query("ab.app", &options).await.unwrap_err();
        assert!(matches!(
            err,
            DomainSweepError::Timeout { .. } | DomainSweepError::TransportError { .. }
        ));
    }
}
