//! WHOIS response parsing and HTTP result shaping.
//!
//! WHOIS answers are loosely structured `Key: Value` text that differs from
//! registry to registry. The parser keeps whatever it can as an ordered tree
//! of fields and never fails; a body it does not understand simply yields an
//! almost empty record.
//!
//! ```
//! use domain_sweep_lib::{parse_whois, ParseOptions};
//!
//! let raw = "Domain Name: ab.app\r\nName Server: ns1.example\r\nName Server: ns2.example\r\n";
//! let record = parse_whois("ab.app", raw, &ParseOptions::default());
//! assert_eq!(record.domain(), Some("ab.app"));
//! assert_eq!(record.get("Name Server").unwrap().values(), vec!["ns1.example", "ns2.example"]);
//! ```

use crate::types::{HttpProbeRecord, HttpStatus, ParseOptions};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Prefix of the trailer line (`>>> Last update of WHOIS database: ... <<<`)
const END_LINE_PREFIX: &str = ">>>";
const END_LINE_SUFFIX: &str = "<<<";
const SEPARATOR: char = ':';

/// Field always set to the queried candidate.
pub const DOMAIN_FIELD: &str = "domain";

/// Value stored under a WHOIS key.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum WhoisValue {
    Text(String),
    /// The key appeared more than once; values in order of appearance
    List(Vec<String>),
    /// Sub-fields produced by nested key addressing
    Branch(WhoisRecord),
}

impl WhoisValue {
    /// Leaf values as a flat list (empty for branches).
    pub fn values(&self) -> Vec<&str> {
        match self {
            WhoisValue::Text(value) => vec![value.as_str()],
            WhoisValue::List(values) => values.iter().map(String::as_str).collect(),
            WhoisValue::Branch(_) => Vec::new(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            WhoisValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

/// Ordered tree of string-keyed WHOIS fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhoisRecord {
    fields: Vec<(String, WhoisValue)>,
}

impl WhoisRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Top-level keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&WhoisValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Follow a path of keys through nested branches.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&WhoisValue> {
        let (last, parents) = path.split_last()?;
        let mut node = self;
        for segment in parents {
            match node.get(segment.as_ref())? {
                WhoisValue::Branch(branch) => node = branch,
                _ => return None,
            }
        }
        node.get(last.as_ref())
    }

    /// The queried candidate, once the parser has stamped it.
    pub fn domain(&self) -> Option<&str> {
        self.get(DOMAIN_FIELD).and_then(WhoisValue::as_text)
    }

    pub fn contains_key_ignore_case(&self, key: &str) -> bool {
        self.keys().any(|k| k.eq_ignore_ascii_case(key))
    }

    /// Whether a top-level key named DNSSEC (any case) is present.
    pub fn has_dnssec(&self) -> bool {
        self.contains_key_ignore_case("dnssec")
    }

    /// Write `value` at `path`.
    ///
    /// Missing intermediate nodes are created; an intermediate leaf is
    /// replaced by a branch. Writing to a key that already holds a value turns
    /// it into a list and appends, except that an empty string is simply
    /// overwritten. A write that lands on an existing branch is dropped.
    pub fn set<S: AsRef<str>>(&mut self, path: &[S], value: impl Into<String>) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        let mut node = self;
        for segment in parents {
            node = node.branch_mut(segment.as_ref());
        }
        node.set_leaf(last.as_ref(), value.into());
    }

    /// Replace the value of a top-level key, inserting it first if absent.
    pub fn stamp(&mut self, key: &str, value: impl Into<String>) {
        let value = WhoisValue::Text(value.into());
        match self.position(key) {
            Some(index) => self.fields[index].1 = value,
            None => self.fields.insert(0, (key.to_string(), value)),
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|(k, _)| k == key)
    }

    fn branch_mut(&mut self, key: &str) -> &mut WhoisRecord {
        let index = match self.position(key) {
            Some(index) => index,
            None => {
                self.fields
                    .push((key.to_string(), WhoisValue::Branch(WhoisRecord::new())));
                self.fields.len() - 1
            }
        };

        let slot = &mut self.fields[index].1;
        if !matches!(slot, WhoisValue::Branch(_)) {
            *slot = WhoisValue::Branch(WhoisRecord::new());
        }
        match slot {
            WhoisValue::Branch(branch) => branch,
            _ => unreachable!("slot was just turned into a branch"),
        }
    }

    fn set_leaf(&mut self, key: &str, value: String) {
        let Some(index) = self.position(key) else {
            self.fields.push((key.to_string(), WhoisValue::Text(value)));
            return;
        };

        let slot = &mut self.fields[index].1;
        *slot = match std::mem::replace(slot, WhoisValue::List(Vec::new())) {
            WhoisValue::Text(existing) if existing.is_empty() => WhoisValue::Text(value),
            WhoisValue::Text(existing) => WhoisValue::List(vec![existing, value]),
            WhoisValue::List(mut values) => {
                values.push(value);
                WhoisValue::List(values)
            }
            WhoisValue::Branch(branch) => {
                tracing::trace!(key, "dropping value written onto a nested WHOIS field");
                WhoisValue::Branch(branch)
            }
        };
    }
}

impl Serialize for WhoisRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Turn a raw key into a field path according to the parse options.
fn key_path(key: &str, options: &ParseOptions) -> Vec<String> {
    let key = if options.lowercase {
        key.to_lowercase()
    } else {
        key.to_string()
    };

    if options.nested {
        key.split_whitespace().map(str::to_string).collect()
    } else {
        vec![key]
    }
}

/// Parse raw WHOIS text into a record for `domain`.
///
/// Lines are read in order. A line containing `:` is split at the first one
/// into key and value. The `>>> ... <<<` trailer is stored without its
/// markers and ends parsing. A non-blank line without a key is appended to
/// the most recently written field, or dropped when there is none yet.
/// The `domain` field is always set to `domain`, whatever the text says.
pub fn parse_whois(domain: &str, raw: &str, options: &ParseOptions) -> WhoisRecord {
    let mut record = WhoisRecord::new();
    let mut last_path: Option<Vec<String>> = None;

    for line in raw.lines() {
        let (key, value, is_end) = match line.split_once(SEPARATOR) {
            Some((raw_key, raw_value)) => {
                let key = raw_key.trim();
                let value = raw_value.trim();
                match key.strip_prefix(END_LINE_PREFIX) {
                    Some(stripped) => {
                        let value = value.strip_suffix(END_LINE_SUFFIX).unwrap_or(value);
                        (stripped.trim(), value.trim(), true)
                    }
                    None => (key, value, false),
                }
            }
            None => ("", line.trim(), false),
        };

        if key.is_empty() {
            if !value.is_empty() {
                match &last_path {
                    Some(path) => record.set(path, value),
                    None => tracing::trace!(line = value, "discarding WHOIS line without a key"),
                }
            }
        } else {
            let path = key_path(key, options);
            record.set(&path, value);
            last_path = Some(path);
        }

        if is_end {
            break;
        }
    }

    record.stamp(DOMAIN_FIELD, domain);
    record
}

/// Shape an HTTP status line into a result record.
pub fn classify_http(domain: &str, status: HttpStatus) -> HttpProbeRecord {
    HttpProbeRecord {
        domain: domain.to_string(),
        status_code: status.status_code,
        method: status.method,
    }
}
