//! Domain Sweep CLI Application
//!
//! Generates candidate domain names (or takes an explicit list), then probes
//! them in batches over WHOIS or HTTP. Results are JSON lines: registered-
//! looking records on stdout, everything else on stderr.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use domain_sweep_lib::config::{parse_timeout_string, MAX_BATCH_SIZE};
use domain_sweep_lib::generate::{generate_candidates, CharacterSet, GenerateConfig};
use domain_sweep_lib::{
    eligible_candidates, load_domain_files, load_env_config, normalize_domain_inputs,
    BatchRunner, ConfigManager, ExclusionSet, FileConfig, ParseOptions, ProbeMethod,
    ProxyConfig, SweepConfig, DEFAULT_DOMAIN_KEY,
};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for domain-sweep
#[derive(Parser, Debug)]
#[command(name = "domain-sweep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate short domain names and sweep them with WHOIS or HTTP probes")]
#[command(
    long_about = "Generate every fixed-length name over a character set (or take an explicit list) and probe each one over WHOIS or HTTP.\n\nRegistered-looking results are printed to stdout as JSON lines; placeholders and errors go to stderr. Feed stdout back in with --domain-exclude-file to skip finished work."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domains to probe instead of generating candidates (repeatable or comma-separated)
    #[arg(long = "domain", value_name = "DOMAIN", value_delimiter = ',', action = clap::ArgAction::Append, help_heading = "Domain Selection")]
    pub domains: Vec<String>,

    /// NDJSON files whose domains are probed instead of generating candidates
    #[arg(
        long = "domain-file",
        value_name = "FILE",
        action = clap::ArgAction::Append,
        help_heading = "Domain Selection"
    )]
    pub domain_files: Vec<String>,

    /// Resume from this domain; earlier candidates are skipped
    #[arg(long = "domain-from", value_name = "DOMAIN", help_heading = "Domain Selection")]
    pub domain_from: Option<String>,

    /// NDJSON files of domains to skip (e.g. the stdout of an earlier run)
    #[arg(
        long = "domain-exclude-file",
        value_name = "FILE",
        action = clap::ArgAction::Append,
        help_heading = "Domain Selection"
    )]
    pub exclude_files: Vec<String>,

    /// JSON key holding the domain in NDJSON files [default: domain]
    #[arg(long = "exclude-key", value_name = "KEY", help_heading = "Domain Selection")]
    pub exclude_key: Option<String>,

    /// Suffixes appended to generated words [default: .app]
    #[arg(
        long = "domain-suffix",
        value_name = "SUFFIX",
        value_delimiter = ',',
        action = clap::ArgAction::Append,
        help_heading = "Domain Generation"
    )]
    pub suffixes: Option<Vec<String>>,

    /// Literal characters to generate from (overrides --chars-group)
    #[arg(long = "chars", value_name = "CHARS", help_heading = "Domain Generation")]
    pub chars: Option<String>,

    /// Named character group: a-z0-9-, a-z0-9, a-z-, a-z, 0-9-, 0-9 [default: a-z]
    #[arg(long = "chars-group", value_name = "GROUP", help_heading = "Domain Generation")]
    pub chars_group: Option<String>,

    /// Length of generated words [default: 3]
    #[arg(long = "length", value_name = "N", help_heading = "Domain Generation")]
    pub length: Option<usize>,

    /// Print the candidates that would be probed (after resume and exclusions) and exit
    #[arg(long = "dry-run", help_heading = "Domain Generation")]
    pub dry_run: bool,

    /// Probe method: whois, http (curl is an alias) [default: whois]
    #[arg(long = "method", value_name = "METHOD", help_heading = "Protocol")]
    pub method: Option<String>,

    /// WHOIS server to query instead of per-TLD resolution
    #[arg(long = "whois-server", value_name = "HOST", help_heading = "Protocol")]
    pub whois_server: Option<String>,

    /// SOCKS proxy for WHOIS (socks5://host:port or socks4://host:port)
    #[arg(long = "proxy", value_name = "URL", help_heading = "Protocol")]
    pub proxy: Option<String>,

    /// Per-probe timeout, e.g. 10s or 1m [default: 10s]
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Protocol")]
    pub timeout: Option<String>,

    /// Candidates probed concurrently per batch [default: 1000]
    #[arg(long = "max-request", value_name = "N", help_heading = "Performance")]
    pub max_request: Option<usize>,

    /// Lowercase WHOIS keys
    #[arg(long = "lowercase-keys", help_heading = "Output Format")]
    pub lowercase_keys: bool,

    /// Split multi-word WHOIS keys into nested objects
    #[arg(long = "nested-keys", help_heading = "Output Format")]
    pub nested_keys: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Debug logging (adds skip decisions to --verbose output)
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging (per-probe start/done/fail, batch progress, run summary)
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

impl Args {
    fn has_explicit_domains(&self) -> bool {
        !self.domains.is_empty() || !self.domain_files.is_empty()
    }

    fn has_generation_flags(&self) -> bool {
        self.chars.is_some()
            || self.chars_group.is_some()
            || self.length.is_some()
            || self.suffixes.is_some()
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
struct Settings {
    sweep: SweepConfig,
    generation: GenerateConfig,
    exclude_files: Vec<String>,
    exclude_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sweep: SweepConfig::default(),
            generation: GenerateConfig::default(),
            exclude_files: Vec::new(),
            exclude_key: DEFAULT_DOMAIN_KEY.to_string(),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_logging(&args);

    if let Err(e) = run_sweep(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over the flags.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(args)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Level used when `RUST_LOG` is unset. Per-probe events log at info.
fn default_log_level(args: &Args) -> &'static str {
    if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    }
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.has_explicit_domains() && args.has_generation_flags() {
        return Err(
            "Generation options (--chars, --chars-group, --length, --domain-suffix) cannot be combined with --domain or --domain-file"
                .to_string(),
        );
    }

    if args.chars.is_some() && args.chars_group.is_some() {
        return Err("Cannot specify both --chars and --chars-group".to_string());
    }

    if matches!(&args.chars, Some(chars) if chars.is_empty()) {
        return Err("--chars cannot be empty".to_string());
    }

    if args.length == Some(0) {
        return Err("Length must be at least 1".to_string());
    }

    if let Some(max_request) = args.max_request {
        if max_request == 0 || max_request > MAX_BATCH_SIZE {
            return Err(format!(
                "--max-request must be between 1 and {}",
                MAX_BATCH_SIZE
            ));
        }
    }

    if matches!(&args.exclude_key, Some(key) if key.is_empty()) {
        return Err("--exclude-key cannot be empty".to_string());
    }

    Ok(())
}

/// Main sweep logic
async fn run_sweep(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = build_config(&args)?;
    let candidates = collect_candidates(&args, &settings).await?;

    let exclusions = ExclusionSet::load(&settings.exclude_files, &settings.exclude_key).await?;
    if !exclusions.is_empty() {
        tracing::info!(count = exclusions.len(), "loaded exclusion list");
    }

    if args.dry_run {
        let eligible =
            eligible_candidates(candidates, settings.sweep.start_from.clone(), &exclusions);
        for candidate in &eligible {
            println!("{}", candidate);
        }
        eprintln!("{} domains would be probed", eligible.len());
        return Ok(());
    }

    ui::warn_large_run(candidates.len(), settings.sweep.batch_size);
    if args.verbose {
        ui::print_plan(candidates.len(), &settings.sweep);
    }

    let runner = BatchRunner::new(settings.sweep)?;
    let mut sink = ui::ResultSink::stdio();
    let summary = runner
        .run(candidates, &exclusions, |result| sink.emit(&result))
        .await;

    if args.verbose {
        ui::print_summary(&summary);
    }

    Ok(())
}

/// Build configuration with proper precedence.
///
/// Precedence (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables (DS_*)
/// 3. Config file (explicit --config / DS_CONFIG, else discovered)
/// 4. Built-in defaults
fn build_config(args: &Args) -> Result<Settings, Box<dyn std::error::Error>> {
    let config_manager = ConfigManager::new();
    let env_config = load_env_config();

    let explicit_path = args.config.clone().or_else(|| env_config.config.clone());
    let file_config = match explicit_path {
        Some(path) => {
            tracing::info!(path = %path, "using explicit config file");
            config_manager
                .load_file(&path)
                .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?
        }
        None => config_manager.discover_and_load(),
    };

    let mut settings = merge_file_config(Settings::default(), file_config)?;

    // Environment variables (DS_*), already validated
    if let Some(method) = env_config.method {
        settings.sweep.method = method;
    }
    if let Some(batch_size) = env_config.batch_size {
        settings.sweep.batch_size = batch_size;
    }
    if let Some(timeout) = env_config.timeout {
        settings.sweep.timeout = timeout;
    }
    if let Some(server) = env_config.whois_server {
        settings.sweep.probe_options.server = Some(server);
    }
    if let Some(proxy) = env_config.proxy {
        settings.sweep.probe_options.proxy = Some(proxy);
    }

    apply_cli_args(settings, args)
}

/// Apply a (validated) file config on top of the defaults.
fn merge_file_config(
    mut settings: Settings,
    file_config: FileConfig,
) -> Result<Settings, Box<dyn std::error::Error>> {
    if let Some(defaults) = file_config.defaults {
        if let Some(method) = defaults.method {
            settings.sweep.method = method.parse()?;
        }
        if let Some(batch_size) = defaults.batch_size {
            settings.sweep.batch_size = batch_size;
        }
        if let Some(timeout) = defaults.timeout {
            settings.sweep.timeout = parse_timeout(&timeout)?;
        }
        if let Some(server) = defaults.whois_server {
            settings.sweep.probe_options.server = Some(server);
        }
        if let Some(proxy) = defaults.proxy {
            settings.sweep.probe_options.proxy = Some(ProxyConfig::parse(&proxy)?);
        }
        if let Some(lowercase) = defaults.lowercase_keys {
            settings.sweep.parse_options.lowercase = lowercase;
        }
        if let Some(nested) = defaults.nested_keys {
            settings.sweep.parse_options.nested = nested;
        }
    }

    if let Some(generation) = file_config.generation {
        if let Some(chars) = generation.chars {
            settings.generation.chars = CharacterSet::new(&chars);
        } else if let Some(group) = generation.chars_group {
            settings.generation.chars = CharacterSet::from_group(&group);
        }
        if let Some(length) = generation.length {
            settings.generation.length = length;
        }
        if let Some(suffixes) = generation.suffixes {
            settings.generation.suffixes = suffixes;
        }
    }

    if let Some(exclusions) = file_config.exclusions {
        if let Some(files) = exclusions.files {
            settings.exclude_files = files;
        }
        if let Some(key) = exclusions.key {
            settings.exclude_key = key;
        }
    }

    Ok(settings)
}

/// Apply CLI arguments (highest precedence).
fn apply_cli_args(
    mut settings: Settings,
    args: &Args,
) -> Result<Settings, Box<dyn std::error::Error>> {
    if let Some(method) = &args.method {
        settings.sweep.method = method.parse::<ProbeMethod>()?;
    }
    if let Some(max_request) = args.max_request {
        settings.sweep.batch_size = max_request;
    }
    if let Some(timeout) = &args.timeout {
        settings.sweep.timeout = parse_timeout(timeout)?;
    }
    if let Some(server) = &args.whois_server {
        settings.sweep.probe_options.server = Some(server.clone());
    }
    if let Some(proxy) = &args.proxy {
        settings.sweep.probe_options.proxy = Some(ProxyConfig::parse(proxy)?);
    }
    if let Some(start) = &args.domain_from {
        settings.sweep.start_from = Some(start.trim().to_string());
    }

    // Boolean flags only ever switch on; off comes from the config default
    let parse_options = settings.sweep.parse_options;
    settings.sweep.parse_options = ParseOptions {
        lowercase: parse_options.lowercase || args.lowercase_keys,
        nested: parse_options.nested || args.nested_keys,
    };

    if let Some(chars) = &args.chars {
        settings.generation.chars = CharacterSet::new(chars);
    } else if let Some(group) = &args.chars_group {
        if !CharacterSet::group_names().contains(&group.as_str()) {
            tracing::warn!(
                group = %group,
                known = ?CharacterSet::group_names(),
                "unknown character group, using its characters literally"
            );
        }
        settings.generation.chars = CharacterSet::from_group(group);
    }
    if let Some(length) = args.length {
        settings.generation.length = length;
    }
    if let Some(suffixes) = &args.suffixes {
        settings.generation.suffixes = suffixes.clone();
    }

    // Exclusion files from the CLI add to those from the config file
    settings.exclude_files.extend(args.exclude_files.iter().cloned());
    if let Some(key) = &args.exclude_key {
        settings.exclude_key = key.clone();
    }

    settings.sweep.validate()?;
    Ok(settings)
}

/// Parse "10s" / "2m" / "30" into a non-zero duration.
fn parse_timeout(timeout_str: &str) -> Result<Duration, String> {
    match parse_timeout_string(timeout_str) {
        Some(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(format!(
            "Invalid timeout '{}'. Use format like '5s', '30s', '2m'",
            timeout_str
        )),
    }
}

/// Explicit domains (flags and files) when given, otherwise generated ones.
async fn collect_candidates(
    args: &Args,
    settings: &Settings,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    if args.has_explicit_domains() {
        let mut domains = normalize_domain_inputs(&args.domains);
        let from_files = load_domain_files(&args.domain_files, &settings.exclude_key).await?;
        domains.extend(normalize_domain_inputs(from_files));
        if domains.is_empty() {
            return Err("No domains found in --domain or --domain-file inputs".into());
        }
        return Ok(domains);
    }

    let generated = generate_candidates(&settings.generation)?;
    let pruned = generated.estimated_count.saturating_sub(generated.candidates.len());
    if pruned > 0 {
        tracing::info!(pruned, "dropped generated words with bad hyphen placement");
    }
    Ok(generated.candidates)
}
