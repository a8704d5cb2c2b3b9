//! # Domain Sweep Library
//!
//! Generate short domain names and probe them in bounded batches over WHOIS
//! or HTTP, turning every answer into a JSON-ready record.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_sweep_lib::generate::{generate_candidates, GenerateConfig};
//! use domain_sweep_lib::{BatchRunner, ExclusionSet, OutputChannel, SweepConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let generated = generate_candidates(&GenerateConfig::default())?;
//!     let runner = BatchRunner::new(SweepConfig::default())?;
//!
//!     runner
//!         .run(generated.candidates, &ExclusionSet::new(), |result| {
//!             if result.channel() == OutputChannel::Primary {
//!                 println!("{}", result.domain());
//!             }
//!         })
//!         .await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Generation**: every fixed-length word over a named or literal alphabet,
//!   with hyphen placement pruned before probing
//! - **WHOIS**: direct port-43 queries, per-TLD server resolution, optional
//!   SOCKS4/SOCKS5 tunnelling
//! - **HTTP**: single HEAD request, redirects reported as-is
//! - **Resumable runs**: start-from marker plus NDJSON exclusion lists

pub use config::{load_env_config, ConfigManager, EnvConfig, FileConfig, GenerationConfig};
pub use error::DomainSweepError;
pub use parser::{classify_http, parse_whois, WhoisRecord, WhoisValue};
pub use protocols::{HttpProber, HttpTransport, WhoisClient, WhoisTransport};
pub use runner::{eligible_candidates, Admission, BatchRunner, CandidateFilter, RunCursor};
pub use sources::{load_domain_files, parse_bulk_json, ExclusionSet, DEFAULT_DOMAIN_KEY};
pub use types::{
    HttpProbeRecord, HttpStatus, OutputChannel, ParseOptions, ProbeError, ProbeMethod,
    ProbeOptions, ProbeResult, ProxyConfig, ProxyKind, RunSummary, SweepConfig,
};
pub use utils::{extract_tld, is_valid_domain, is_valid_label, normalize_domain_inputs};

// Public modules
pub mod config;
pub mod generate;
pub mod protocols;

mod error;
mod parser;
mod runner;
mod sources;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DomainSweepError>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
