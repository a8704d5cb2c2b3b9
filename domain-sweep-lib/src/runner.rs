//! Batched probe dispatch.
//!
//! The `BatchRunner` walks a candidate sequence in fixed-size chunks. Each
//! chunk is filtered (resume cursor, label shape, exclusions) and whatever is
//! left is probed concurrently; the next chunk is not pulled until every probe
//! of the current one has settled. Results are handed to the caller as they
//! complete, so ordering within a batch follows completion, not input.

use crate::error::DomainSweepError;
use crate::parser::{classify_http, parse_whois};
use crate::protocols::{HttpProber, HttpTransport, WhoisClient, WhoisTransport};
use crate::sources::ExclusionSet;
use crate::types::{ProbeError, ProbeMethod, ProbeResult, RunSummary, SweepConfig};
use crate::utils::is_valid_domain;
use futures::stream::{FuturesUnordered, StreamExt};

/// Resume marker for a run.
///
/// Until the marker domain is seen, every candidate is skipped. The marker
/// itself is admitted and from then on the cursor stays open. Without a
/// marker the cursor starts open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCursor {
    start_from: Option<String>,
    started: bool,
}

impl RunCursor {
    pub fn new(start_from: Option<String>) -> Self {
        let started = start_from.is_none();
        Self {
            start_from,
            started,
        }
    }

    /// Whether `domain` may be probed, flipping the cursor open on an exact match.
    pub fn admit(&mut self, domain: &str) -> bool {
        if !self.started && self.start_from.as_deref() == Some(domain) {
            self.started = true;
        }
        self.started
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

/// Why a candidate was or was not let through to a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Eligible,
    BeforeCursor,
    Invalid,
    Excluded,
}

/// The per-candidate gate shared by real runs and dry runs: resume cursor
/// first, then label shape, then exclusion membership.
#[derive(Debug)]
pub struct CandidateFilter<'a> {
    cursor: RunCursor,
    exclusions: &'a ExclusionSet,
}

impl<'a> CandidateFilter<'a> {
    pub fn new(start_from: Option<String>, exclusions: &'a ExclusionSet) -> Self {
        Self {
            cursor: RunCursor::new(start_from),
            exclusions,
        }
    }

    pub fn check(&mut self, domain: &str) -> Admission {
        if !self.cursor.admit(domain) {
            return Admission::BeforeCursor;
        }
        if !is_valid_domain(domain) {
            tracing::debug!(domain, "skipping invalid domain");
            return Admission::Invalid;
        }
        if self.exclusions.contains(domain) {
            tracing::debug!(domain, "skipping excluded domain");
            return Admission::Excluded;
        }
        Admission::Eligible
    }

    pub fn is_started(&self) -> bool {
        self.cursor.is_started()
    }
}

/// Candidates that a run with `start_from` and `exclusions` would dispatch,
/// in input order.
pub fn eligible_candidates<I>(
    candidates: I,
    start_from: Option<String>,
    exclusions: &ExclusionSet,
) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut filter = CandidateFilter::new(start_from, exclusions);
    candidates
        .into_iter()
        .filter(|domain| filter.check(domain) == Admission::Eligible)
        .collect()
}

/// Drives probes over a candidate sequence.
///
/// # Example
///
/// ```rust,no_run
/// use domain_sweep_lib::{BatchRunner, ExclusionSet, SweepConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let runner = BatchRunner::new(SweepConfig::default().with_batch_size(50))?;
///     let candidates = vec!["ab.app".to_string(), "cd.app".to_string()];
///
///     let summary = runner
///         .run(candidates, &ExclusionSet::new(), |result| {
///             println!("{}", result.to_json_line().unwrap_or_default());
///         })
///         .await;
///     println!("dispatched {}", summary.dispatched);
///     Ok(())
/// }
/// ```
pub struct BatchRunner<W = WhoisClient, H = HttpProber> {
    config: SweepConfig,
    whois: W,
    http: H,
}

impl BatchRunner {
    /// Create a runner backed by the network transports.
    pub fn new(config: SweepConfig) -> Result<Self, DomainSweepError> {
        let whois = WhoisClient::with_timeout(config.timeout);
        let http = HttpProber::with_timeout(config.timeout)?;
        Self::with_transports(config, whois, http)
    }
}

impl<W, H> BatchRunner<W, H>
where
    W: WhoisTransport,
    H: HttpTransport,
{
    /// Create a runner with caller-supplied transports.
    pub fn with_transports(config: SweepConfig, whois: W, http: H) -> Result<Self, DomainSweepError> {
        config.validate()?;
        Ok(Self {
            config,
            whois,
            http,
        })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Probe a single domain with the configured method.
    ///
    /// Never fails: transport errors come back as [`ProbeResult::Error`].
    pub async fn probe_one(&self, domain: &str) -> ProbeResult {
        tracing::info!(domain, method = %self.config.method, "probe started");

        let outcome = match self.config.method {
            ProbeMethod::Whois => self
                .whois
                .query(domain, &self.config.probe_options)
                .await
                .map(|raw| ProbeResult::Whois(parse_whois(domain, &raw, &self.config.parse_options))),
            ProbeMethod::Http => self
                .http
                .probe(domain)
                .await
                .map(|status| ProbeResult::Http(classify_http(domain, status))),
        };

        match outcome {
            Ok(result) => {
                tracing::info!(domain, "probe done");
                result
            }
            Err(e) => {
                tracing::info!(domain, error = %e, "probe failed");
                ProbeResult::Error(ProbeError {
                    domain: domain.to_string(),
                    error_message: e.probe_message(),
                })
            }
        }
    }

    /// Probe every eligible candidate, batch by batch.
    ///
    /// `emit` is called exactly once per dispatched candidate.
    pub async fn run<I, F>(&self, candidates: I, exclusions: &ExclusionSet, mut emit: F) -> RunSummary
    where
        I: IntoIterator<Item = String>,
        F: FnMut(ProbeResult),
    {
        let mut filter = CandidateFilter::new(self.config.start_from.clone(), exclusions);
        let mut summary = RunSummary::default();
        let mut candidates = candidates.into_iter();

        loop {
            let chunk: Vec<String> = candidates.by_ref().take(self.config.batch_size).collect();
            if chunk.is_empty() {
                break;
            }
            summary.seen += chunk.len();

            let mut eligible = Vec::with_capacity(chunk.len());
            for domain in chunk {
                match filter.check(&domain) {
                    Admission::Eligible => eligible.push(domain),
                    Admission::BeforeCursor => summary.skipped_before_cursor += 1,
                    Admission::Invalid => summary.skipped_invalid += 1,
                    Admission::Excluded => summary.skipped_excluded += 1,
                }
            }

            if eligible.is_empty() {
                continue;
            }

            summary.batches += 1;
            summary.dispatched += eligible.len();
            tracing::info!(batch = summary.batches, size = eligible.len(), "dispatching batch");

            let mut in_flight: FuturesUnordered<_> =
                eligible.iter().map(|domain| self.probe_one(domain)).collect();
            while let Some(result) = in_flight.next().await {
                summary.record(&result);
                emit(result);
            }
        }

        if !filter.is_started() {
            tracing::warn!(
                start_from = ?self.config.start_from,
                "resume marker never matched, nothing was probed"
            );
        }
        tracing::info!(
            seen = summary.seen,
            dispatched = summary.dispatched,
            primary = summary.primary,
            secondary = summary.secondary,
            errors = summary.errors,
            "run finished"
        );
        summary
    }
}
