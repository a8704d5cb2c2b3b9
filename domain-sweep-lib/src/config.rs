//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files, reading
//! `DS_*` environment variables, and merging file configurations with proper
//! precedence rules. Turning the merged values into a [`SweepConfig`] is left
//! to the caller, which knows what the command line overrides.
//!
//! [`SweepConfig`]: crate::SweepConfig

use crate::error::DomainSweepError;
use crate::types::{ProbeMethod, ProxyConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest batch a config file or environment variable may request.
pub const MAX_BATCH_SIZE: usize = 100_000;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Default values for probe options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Candidate generation defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationConfig>,

    /// Exclusion lists applied to every run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusions: Option<ExclusionsConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Probe method (`whois`, `http`, `curl`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Candidates per batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    /// Default timeout (as string, e.g., "5s", "30s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// WHOIS server override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_server: Option<String>,

    /// SOCKS proxy URL for WHOIS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowercase_keys: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested_keys: Option<bool>,
}

/// Candidate generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationConfig {
    /// Literal alphabet; wins over `chars_group`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chars: Option<String>,

    /// Named alphabet such as `a-z0-9-`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chars_group: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,

    /// Suffixes to append to generated words
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffixes: Option<Vec<String>>,
}

/// Exclusion list configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ExclusionsConfig {
    /// NDJSON files whose domains are never probed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,

    /// JSON key holding the domain in each line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Default)]
pub struct ConfigManager;

impl ConfigManager {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, DomainSweepError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DomainSweepError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DomainSweepError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            DomainSweepError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is lowest, then the home directory, then the current
    /// directory. Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> FileConfig {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping config file"),
            }
        }

        if loaded_files.len() > 1 {
            tracing::info!(
                files = ?loaded_files,
                "multiple config files found, later files take precedence"
            );
        }

        merged_config
    }

    /// Look for a config file in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./domain-sweep.toml", "./.domain-sweep.toml"]
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Look for a config file in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".domain-sweep.toml", "domain-sweep.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-sweep").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations; values from `higher` win field by field.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower), Some(higher)) => Some(DefaultsConfig {
                    method: higher.method.or(lower.method),
                    batch_size: higher.batch_size.or(lower.batch_size),
                    timeout: higher.timeout.or(lower.timeout),
                    whois_server: higher.whois_server.or(lower.whois_server),
                    proxy: higher.proxy.or(lower.proxy),
                    lowercase_keys: higher.lowercase_keys.or(lower.lowercase_keys),
                    nested_keys: higher.nested_keys.or(lower.nested_keys),
                }),
                (lower, higher) => higher.or(lower),
            },
            generation: match (lower.generation, higher.generation) {
                (Some(lower), Some(higher)) => Some(GenerationConfig {
                    chars: higher.chars.or(lower.chars),
                    chars_group: higher.chars_group.or(lower.chars_group),
                    length: higher.length.or(lower.length),
                    suffixes: higher.suffixes.or(lower.suffixes),
                }),
                (lower, higher) => higher.or(lower),
            },
            exclusions: match (lower.exclusions, higher.exclusions) {
                (Some(lower), Some(higher)) => Some(ExclusionsConfig {
                    files: higher.files.or(lower.files),
                    key: higher.key.or(lower.key),
                }),
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    pub fn validate_config(&self, config: &FileConfig) -> Result<(), DomainSweepError> {
        if let Some(defaults) = &config.defaults {
            if let Some(method) = &defaults.method {
                method.parse::<ProbeMethod>()?;
            }

            if let Some(batch_size) = defaults.batch_size {
                if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
                    return Err(DomainSweepError::config(format!(
                        "Batch size must be between 1 and {}",
                        MAX_BATCH_SIZE
                    )));
                }
            }

            if let Some(timeout_str) = &defaults.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(DomainSweepError::config(format!(
                        "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                        timeout_str
                    )));
                }
            }

            if let Some(proxy) = &defaults.proxy {
                ProxyConfig::parse(proxy)?;
            }
        }

        if let Some(generation) = &config.generation {
            if generation.length == Some(0) {
                return Err(DomainSweepError::config(
                    "Generation length must be at least 1",
                ));
            }
            if matches!(&generation.suffixes, Some(s) if s.is_empty()) {
                return Err(DomainSweepError::config(
                    "Generation suffixes cannot be an empty list",
                ));
            }
        }

        if let Some(exclusions) = &config.exclusions {
            if matches!(&exclusions.key, Some(k) if k.is_empty()) {
                return Err(DomainSweepError::config("Exclusion key cannot be empty"));
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via DS_* environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub method: Option<ProbeMethod>,
    pub batch_size: Option<usize>,
    pub timeout: Option<Duration>,
    pub whois_server: Option<String>,
    pub proxy: Option<ProxyConfig>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Build from an arbitrary variable lookup. Invalid values are logged and
    /// ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env_config = EnvConfig::default();

        if let Some(val) = lookup("DS_METHOD") {
            match val.parse::<ProbeMethod>() {
                Ok(method) => env_config.method = Some(method),
                Err(_) => tracing::warn!("Invalid DS_METHOD='{}', use whois or http", val),
            }
        }

        if let Some(val) = lookup("DS_BATCH_SIZE") {
            match val.trim().parse::<usize>() {
                Ok(size) if size > 0 && size <= MAX_BATCH_SIZE => {
                    env_config.batch_size = Some(size)
                }
                _ => tracing::warn!(
                    "Invalid DS_BATCH_SIZE='{}', must be 1-{}",
                    val,
                    MAX_BATCH_SIZE
                ),
            }
        }

        if let Some(val) = lookup("DS_TIMEOUT") {
            match parse_timeout_string(&val) {
                Some(secs) if secs > 0 => env_config.timeout = Some(Duration::from_secs(secs)),
                _ => tracing::warn!(
                    "Invalid DS_TIMEOUT='{}', use format like '5s', '30s', '2m'",
                    val
                ),
            }
        }

        if let Some(server) = lookup("DS_WHOIS_SERVER") {
            if !server.trim().is_empty() {
                env_config.whois_server = Some(server.trim().to_string());
            }
        }

        if let Some(val) = lookup("DS_PROXY") {
            match ProxyConfig::parse(&val) {
                Ok(proxy) => env_config.proxy = Some(proxy),
                Err(e) => tracing::warn!("Ignoring DS_PROXY: {}", e),
            }
        }

        if let Some(path) = lookup("DS_CONFIG") {
            if !path.trim().is_empty() {
                env_config.config = Some(path);
            }
        }

        env_config
    }
}

/// Load configuration from the process environment.
pub fn load_env_config() -> EnvConfig {
    EnvConfig::from_lookup(|name| env::var(name).ok())
}

/// Parse a timeout string like "5s", "30s", "2m" into seconds.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok()
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        // Assume seconds if no unit
        timeout_str.parse::<u64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_parse_timeout_string() {
        assert_eq!(parse_timeout_string("5s"), Some(5));
        assert_eq!(parse_timeout_string("30S"), Some(30));
        assert_eq!(parse_timeout_string("2m"), Some(120));
        assert_eq!(parse_timeout_string("5"), Some(5));
        assert_eq!(parse_timeout_string("invalid"), None);
        assert_eq!(parse_timeout_string("s"), None);
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[defaults]
method = "http"
batch_size = 250
timeout = "30s"
proxy = "socks5://127.0.0.1:1080"

[generation]
chars_group = "a-z0-9"
length = 2
suffixes = [".app", ".dev"]

[exclusions]
files = ["done.jsonl"]
"#,
        );

        let config = ConfigManager::new().load_file(temp_file.path()).unwrap();

        let defaults = config.defaults.unwrap();
        assert_eq!(defaults.method.as_deref(), Some("http"));
        assert_eq!(defaults.batch_size, Some(250));
        assert_eq!(defaults.timeout.as_deref(), Some("30s"));

        let generation = config.generation.unwrap();
        assert_eq!(generation.length, Some(2));
        assert_eq!(
            generation.suffixes,
            Some(vec![".app".to_string(), ".dev".to_string()])
        );

        let exclusions = config.exclusions.unwrap();
        assert_eq!(exclusions.files, Some(vec!["done.jsonl".to_string()]));
        assert_eq!(exclusions.key, None);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigManager::new()
            .load_file("/nonexistent/domain-sweep.toml")
            .unwrap_err();
        assert!(matches!(err, DomainSweepError::FileError { .. }));
    }

    #[test]
    fn test_load_malformed_toml() {
        let temp_file = write_config("[defaults\nbatch_size = ");
        let err = ConfigManager::new().load_file(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let manager = ConfigManager::new();
        let cases = [
            "[defaults]\nbatch_size = 0\n",
            "[defaults]\nbatch_size = 1000000\n",
            "[defaults]\ntimeout = \"soon\"\n",
            "[defaults]\nmethod = \"dns\"\n",
            "[defaults]\nproxy = \"http://127.0.0.1:8080\"\n",
            "[generation]\nlength = 0\n",
            "[generation]\nsuffixes = []\n",
            "[exclusions]\nkey = \"\"\n",
        ];

        for content in cases {
            let temp_file = write_config(content);
            assert!(
                manager.load_file(temp_file.path()).is_err(),
                "expected rejection of {:?}",
                content
            );
        }
    }

    #[test]
    fn test_merge_configs_higher_wins_per_field() {
        let manager = ConfigManager::new();
        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                batch_size: Some(10),
                timeout: Some("5s".to_string()),
                ..Default::default()
            }),
            generation: Some(GenerationConfig {
                length: Some(4),
                ..Default::default()
            }),
            exclusions: None,
        };
        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                batch_size: Some(20),
                ..Default::default()
            }),
            generation: None,
            exclusions: Some(ExclusionsConfig {
                key: Some("name".to_string()),
                files: None,
            }),
        };

        let merged = manager.merge_configs(lower, higher);
        let defaults = merged.defaults.unwrap();
        assert_eq!(defaults.batch_size, Some(20));
        assert_eq!(defaults.timeout.as_deref(), Some("5s"));
        assert_eq!(merged.generation.unwrap().length, Some(4));
        assert_eq!(merged.exclusions.unwrap().key.as_deref(), Some("name"));
    }

    #[test]
    fn test_env_config_valid_values() {
        let env_config = EnvConfig::from_lookup(lookup_from(&[
            ("DS_METHOD", "curl"),
            ("DS_BATCH_SIZE", "50"),
            ("DS_TIMEOUT", "1m"),
            ("DS_WHOIS_SERVER", " whois.nic.google "),
            ("DS_PROXY", "socks4://10.0.0.1:9050"),
            ("DS_CONFIG", "/etc/domain-sweep.toml"),
        ]));

        assert_eq!(env_config.method, Some(ProbeMethod::Http));
        assert_eq!(env_config.batch_size, Some(50));
        assert_eq!(env_config.timeout, Some(Duration::from_secs(60)));
        assert_eq!(env_config.whois_server.as_deref(), Some("whois.nic.google"));
        assert_eq!(env_config.proxy.unwrap().port, 9050);
        assert_eq!(env_config.config.as_deref(), Some("/etc/domain-sweep.toml"));
    }

    #[test]
    fn test_env_config_ignores_invalid_values() {
        let env_config = EnvConfig::from_lookup(lookup_from(&[
            ("DS_METHOD", "ftp"),
            ("DS_BATCH_SIZE", "0"),
            ("DS_TIMEOUT", "0s"),
            ("DS_WHOIS_SERVER", "   "),
            ("DS_PROXY", "http://proxy:3128"),
        ]));

        assert_eq!(env_config, EnvConfig::default());
    }
}
