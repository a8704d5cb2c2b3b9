//! Terminal output for the domain-sweep CLI.
//!
//! Results are JSON lines: primary ones on stdout, secondary ones on stderr.
//! Everything human-readable (plan, warnings, summary) also goes to stderr
//! so stdout can be piped straight into another sweep's exclusion file.

use console::{style, Term};
use domain_sweep_lib::{OutputChannel, ProbeResult, RunSummary, SweepConfig};
use std::io::{self, Write};

/// Candidate count above which a run gets a size warning.
pub const LARGE_RUN_THRESHOLD: usize = 50_000;

/// Writes each result as one JSON line on its channel's stream.
pub struct ResultSink<P: Write, S: Write> {
    primary: P,
    secondary: S,
    failed: bool,
}

impl ResultSink<io::Stdout, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<P: Write, S: Write> ResultSink<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self {
            primary,
            secondary,
            failed: false,
        }
    }

    /// Emit one result. Write failures (e.g. a closed pipe) are reported once
    /// and then dropped silently.
    pub fn emit(&mut self, result: &ProbeResult) {
        if self.failed {
            return;
        }

        let line = match result.to_json_line() {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(domain = result.domain(), error = %e, "failed to serialize result");
                return;
            }
        };

        let written = match result.channel() {
            OutputChannel::Primary => writeln!(self.primary, "{}", line),
            OutputChannel::Secondary => writeln!(self.secondary, "{}", line),
        };

        if let Err(e) = written {
            tracing::warn!(error = %e, "output stream closed, discarding further results");
            self.failed = true;
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> (P, S) {
        (self.primary, self.secondary)
    }
}

/// One-line description of what is about to run.
pub fn format_plan(candidates: usize, config: &SweepConfig) -> String {
    let mut parts = vec![
        format!("method: {}", config.method),
        format!("batch size: {}", config.batch_size),
        format!("timeout: {}s", config.timeout.as_secs()),
    ];
    if let Some(server) = &config.probe_options.server {
        parts.push(format!("whois server: {}", server));
    }
    if let Some(proxy) = &config.probe_options.proxy {
        parts.push(format!("proxy: {}", proxy));
    }
    if let Some(start) = &config.start_from {
        parts.push(format!("from: {}", start));
    }

    format!(
        "{} {} ({})",
        style("domain-sweep").bold(),
        style(format!(
            "sweeping {} candidate{}",
            candidates,
            if candidates == 1 { "" } else { "s" }
        ))
        .dim(),
        parts.join(", ")
    )
}

pub fn print_plan(candidates: usize, config: &SweepConfig) {
    let _ = Term::stderr().write_line(&format_plan(candidates, config));
}

/// Warn before very large sweeps.
pub fn warn_large_run(candidates: usize, batch_size: usize) {
    if candidates <= LARGE_RUN_THRESHOLD {
        return;
    }
    let batches = candidates.div_ceil(batch_size.max(1));
    let _ = Term::stderr().write_line(&format!(
        "{} {} candidates in {} batches, this will take a while",
        style("warning:").yellow().bold(),
        candidates,
        batches
    ));
}

/// Run summary lines (shown with `--verbose`).
pub fn format_summary(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} dispatched in {} batch{}",
        style("done:").green().bold(),
        summary.dispatched,
        summary.batches,
        if summary.batches == 1 { "" } else { "es" }
    )];
    lines.push(format!(
        "  {} primary, {} secondary ({} errors)",
        summary.primary, summary.secondary, summary.errors
    ));

    let skipped = summary.skipped_before_cursor + summary.skipped_invalid + summary.skipped_excluded;
    if skipped > 0 {
        lines.push(format!(
            "  {} skipped: {} before start marker, {} invalid, {} excluded",
            skipped, summary.skipped_before_cursor, summary.skipped_invalid, summary.skipped_excluded
        ));
    }
    lines
}

pub fn print_summary(summary: &RunSummary) {
    let term = Term::stderr();
    for line in format_summary(summary) {
        let _ = term.write_line(&line);
    }
}
