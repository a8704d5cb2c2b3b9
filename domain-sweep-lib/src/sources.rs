//! Newline-delimited JSON domain lists.
//!
//! Output from earlier sweeps is one JSON object per line, so it can be fed
//! straight back in: as an exclusion list (skip what was already probed) or
//! as a candidate list. Lines that are not JSON objects carrying the
//! requested key as a string are skipped without comment.

use crate::error::DomainSweepError;
use std::collections::HashSet;
use std::path::Path;

/// Key looked up in every JSON line unless configured otherwise.
pub const DEFAULT_DOMAIN_KEY: &str = "domain";

/// Domains that must not be probed during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    domains: HashSet<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact string membership.
    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Load and merge exclusion files.
    pub async fn load<P: AsRef<Path>>(paths: &[P], key: &str) -> Result<Self, DomainSweepError> {
        let domains = load_domain_files(paths, key).await?;
        Ok(domains.into_iter().collect())
    }
}

impl FromIterator<String> for ExclusionSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            domains: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for ExclusionSet {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

/// Collect `key` from every JSON-object line of `text`, in line order.
pub fn parse_bulk_json(text: &str, key: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter_map(|json| json.get(key).and_then(|v| v.as_str()).map(str::to_string))
        .collect()
}

/// Read a single NDJSON file and collect `key` from each line.
pub async fn load_domain_file<P: AsRef<Path>>(
    path: P,
    key: &str,
) -> Result<Vec<String>, DomainSweepError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        DomainSweepError::file_error(path.to_string_lossy(), format!("Failed to read file: {}", e))
    })?;

    let domains = parse_bulk_json(&text, key);
    tracing::debug!(path = %path.display(), count = domains.len(), "loaded domain list");
    Ok(domains)
}

/// Read several NDJSON files concurrently and concatenate them in path order.
pub async fn load_domain_files<P: AsRef<Path>>(
    paths: &[P],
    key: &str,
) -> Result<Vec<String>, DomainSweepError> {
    let lists =
        futures::future::try_join_all(paths.iter().map(|path| load_domain_file(path, key))).await?;
    Ok(lists.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_bulk_json_skips_bad_lines() {
        let text = r#"{"domain":"aa.app","DNSSEC":"unsigned"}
not json at all
{"other":"bb.app"}

  {"domain":"cc.app"}
{"domain":42}
["domain"]
"#;
        assert_eq!(parse_bulk_json(text, "domain"), vec!["aa.app", "cc.app"]);
    }

    #[test]
    fn test_parse_bulk_json_custom_key() {
        let text = "{\"Domain Name\":\"AA.APP\"}\n{\"domain\":\"bb.app\"}\n";
        assert_eq!(parse_bulk_json(text, "Domain Name"), vec!["AA.APP"]);
    }

    #[test]
    fn test_exclusion_set_membership_is_exact() {
        let set: ExclusionSet = ["aa.app", "bb.app"].into_iter().collect();
        assert!(set.contains("aa.app"));
        assert!(!set.contains("AA.app"));
        assert!(!set.contains("aa.app "));
        assert_eq!(set.len(), 2);
    }

    #[tokio::test]
    async fn test_load_files_in_path_order() {
        let first = write_temp("{\"domain\":\"aa.app\"}\n{\"domain\":\"ab.app\"}\n");
        let second = write_temp("garbage\n{\"domain\":\"ba.app\"}\n");

        let domains = load_domain_files(&[first.path(), second.path()], DEFAULT_DOMAIN_KEY)
            .await
            .unwrap();
        assert_eq!(domains, vec!["aa.app", "ab.app", "ba.app"]);

        let set = ExclusionSet::load(&[second.path(), first.path()], DEFAULT_DOMAIN_KEY)
            .await
            .unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.contains("ba.app"));
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let result = load_domain_files(&["/nonexistent/sweep-results.jsonl"], "domain").await;
        let err = result.unwrap_err();
        assert!(matches!(err, DomainSweepError::FileError { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_no_paths_gives_empty_set() {
        let paths: Vec<&str> = Vec::new();
        let set = ExclusionSet::load(&paths, DEFAULT_DOMAIN_KEY).await.unwrap();
        assert!(set.is_empty());
    }
}
