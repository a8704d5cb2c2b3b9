//! Candidate domain generation.
//!
//! Candidates are every word of a fixed length over a character set, each
//! followed by a suffix such as `.app`. Words whose hyphens would make an
//! invalid label are pruned while the suffix is attached, so they never reach
//! the network.
//!
//! # Character groups
//!
//! - `a-z0-9-`, `a-z0-9`, `a-z-`, `a-z`, `0-9-`, `0-9`: the named alphabets
//! - anything else: taken literally, one character per slot option
//!
//! # Examples
//!
//! ```
//! use domain_sweep_lib::generate::{build_word_list, CharacterSet};
//!
//! let chars = CharacterSet::new("ab");
//! let words = build_word_list(&chars, 2, ".app");
//! assert_eq!(words, vec!["aa.app", "ab.app", "ba.app", "bb.app"]);
//! ```
//!
//! Output size grows as `|chars|^length`; full-alphabet sweeps are only
//! practical up to a length of about four.

use crate::error::DomainSweepError;
use crate::utils::is_valid_label;

const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";

/// Named alphabet used when neither `--chars` nor `--chars-group` is given.
pub const DEFAULT_CHARS_GROUP: &str = "a-z";

/// Ordered alphabet for generation, without duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CharacterSet {
    chars: Vec<char>,
}

impl CharacterSet {
    /// Build a set from literal characters, keeping first occurrences.
    pub fn new(chars: &str) -> Self {
        let mut set: Vec<char> = Vec::with_capacity(chars.len());
        for c in chars.chars() {
            if !set.contains(&c) {
                set.push(c);
            }
        }
        Self { chars: set }
    }

    /// Resolve a named group, or fall back to the literal characters.
    pub fn from_group(group: &str) -> Self {
        let expanded = match group {
            "a-z0-9-" => format!("{}{}-", LOWERCASE, DIGITS),
            "a-z0-9" => format!("{}{}", LOWERCASE, DIGITS),
            "a-z-" => format!("{}-", LOWERCASE),
            "a-z" => LOWERCASE.to_string(),
            "0-9-" => format!("{}-", DIGITS),
            "0-9" => DIGITS.to_string(),
            literal => literal.to_string(),
        };
        Self::new(&expanded)
    }

    /// Names accepted by [`CharacterSet::from_group`].
    pub fn group_names() -> &'static [&'static str] {
        &["a-z0-9-", "a-z0-9", "a-z-", "a-z", "0-9-", "0-9"]
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }
}

impl std::fmt::Display for CharacterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for c in &self.chars {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Parameters for a full generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateConfig {
    pub chars: CharacterSet,
    pub length: usize,
    /// Suffixes in the order their candidate blocks are emitted
    pub suffixes: Vec<String>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            chars: CharacterSet::from_group(DEFAULT_CHARS_GROUP),
            length: 3,
            suffixes: vec![".app".to_string()],
        }
    }
}

/// Generated candidates plus the pre-pruning estimate.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub candidates: Vec<String>,
    pub estimated_count: usize,
}

/// A finished word is kept unless its hyphens would make a bad label.
fn keep_final_word(word: &str) -> bool {
    is_valid_label(word)
}

/// Append one character to every word, in (word, char) order.
///
/// With `suffix = Some(..)` this is the final step: the suffix is attached
/// and words with bad hyphen placement are dropped. An empty suffix means no
/// pruning at all.
fn extend_word_list(words: &[String], chars: &CharacterSet, suffix: Option<&str>) -> Vec<String> {
    let mut extended = Vec::with_capacity(words.len().saturating_mul(chars.len()));
    for word in words {
        for &c in chars.chars() {
            let mut next = String::with_capacity(word.len() + 1);
            next.push_str(word);
            next.push(c);

            match suffix {
                Some(suffix) if !suffix.is_empty() => {
                    if !keep_final_word(&next) {
                        continue;
                    }
                    next.push_str(suffix);
                }
                _ => {}
            }
            extended.push(next);
        }
    }
    extended
}

/// Build every word of `length` characters over `chars`, each followed by `suffix`.
///
/// - `length == 0` yields nothing.
/// - `length == 1` yields each character with the suffix, unpruned.
/// - otherwise words grow one character per step and the suffix (with
///   pruning) is applied on the last step only.
pub fn build_word_list(chars: &CharacterSet, length: usize, suffix: &str) -> Vec<String> {
    match length {
        0 => Vec::new(),
        1 => chars
            .chars()
            .iter()
            .map(|c| format!("{}{}", c, suffix))
            .collect(),
        _ => {
            let mut words: Vec<String> = chars.chars().iter().map(|c| c.to_string()).collect();
            for step in 2..=length {
                let final_suffix = if step == length { Some(suffix) } else { None };
                words = extend_word_list(&words, chars, final_suffix);
            }
            words
        }
    }
}

/// Run [`build_word_list`] once per suffix and concatenate, in suffix order.
pub fn build_candidates(chars: &CharacterSet, length: usize, suffixes: &[String]) -> Vec<String> {
    suffixes
        .iter()
        .flat_map(|suffix| build_word_list(chars, length, suffix))
        .collect()
}

/// Candidate count before pruning: `|chars|^length` per suffix.
pub fn estimate_candidate_count(chars: &CharacterSet, length: usize, suffix_count: usize) -> usize {
    if length == 0 {
        return 0;
    }
    let mut count: usize = 1;
    for _ in 0..length {
        count = count.saturating_mul(chars.len());
    }
    count.saturating_mul(suffix_count)
}

/// Validate a generation config and build its candidates.
pub fn generate_candidates(config: &GenerateConfig) -> Result<GenerationResult, DomainSweepError> {
    if config.chars.is_empty() {
        return Err(DomainSweepError::config(
            "Character set for generation cannot be empty",
        ));
    }
    if config.suffixes.is_empty() {
        return Err(DomainSweepError::config(
            "At least one domain suffix is required for generation",
        ));
    }

    let estimated_count =
        estimate_candidate_count(&config.chars, config.length, config.suffixes.len());
    tracing::debug!(
        chars = %config.chars,
        length = config.length,
        suffixes = config.suffixes.len(),
        estimated_count,
        "generating candidates"
    );

    Ok(GenerationResult {
        candidates: build_candidates(&config.chars, config.length, &config.suffixes),
        estimated_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffixes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    // ── Character sets ──────────────────────────────────────────────

    #[test]
    fn test_character_set_dedup_keeps_order() {
        let chars = CharacterSet::new("abca-b");
        assert_eq!(chars.chars(), &['a', 'b', 'c', '-']);
        assert_eq!(chars.to_string(), "abc-");
    }

    #[test]
    fn test_named_groups() {
        assert_eq!(CharacterSet::from_group("a-z").len(), 26);
        assert_eq!(CharacterSet::from_group("a-z-").len(), 27);
        assert_eq!(CharacterSet::from_group("a-z0-9").len(), 36);
        assert_eq!(CharacterSet::from_group("a-z0-9-").len(), 37);
        assert_eq!(CharacterSet::from_group("0-9").len(), 10);
        assert_eq!(CharacterSet::from_group("0-9-").len(), 11);
    }

    #[test]
    fn test_every_group_name_expands() {
        for name in CharacterSet::group_names() {
            assert_ne!(CharacterSet::from_group(name), CharacterSet::new(name), "{}", name);
        }
        assert!(CharacterSet::group_names().contains(&DEFAULT_CHARS_GROUP));
    }

    #[test]
    fn test_unknown_group_is_literal() {
        assert_eq!(CharacterSet::from_group("xyz").chars(), &['x', 'y', 'z']);
        assert_eq!(CharacterSet::from_group("0").chars(), &['0']);
    }

    // ── Word lists ──────────────────────────────────────────────────

    #[test]
    fn test_length_zero_is_empty() {
        let chars = CharacterSet::new("ab");
        assert!(build_word_list(&chars, 0, ".app").is_empty());
    }

    #[test]
    fn test_length_one_appends_suffix_without_pruning() {
        let chars = CharacterSet::new("a-");
        assert_eq!(build_word_list(&chars, 1, ".app"), vec!["a.app", "-.app"]);
    }

    #[test]
    fn test_two_chars_two_long() {
        let chars = CharacterSet::new("ab");
        assert_eq!(
            build_word_list(&chars, 2, ".app"),
            vec!["aa.app", "ab.app", "ba.app", "bb.app"]
        );
    }

    #[test]
    fn test_unsuffixed_count_is_full_power() {
        let chars = CharacterSet::new("a-b");
        for length in 1..=4 {
            let words = build_word_list(&chars, length, "");
            assert_eq!(words.len(), 3usize.pow(length as u32));
        }
    }

    #[test]
    fn test_suffixed_words_are_pruned() {
        let chars = CharacterSet::new("a-");
        let words = build_word_list(&chars, 3, ".app");
        // Of the 8 words only "aaa" and "a-a" survive
        assert_eq!(words, vec!["aaa.app", "a-a.app"]);

        let chars = CharacterSet::from_group("a-z0-9-");
        for candidate in build_word_list(&chars, 3, ".dev") {
            let word = candidate.strip_suffix(".dev").unwrap();
            assert!(!word.starts_with('-'));
            assert!(!word.ends_with('-'));
            assert!(!word.contains("--"));
        }
    }

    #[test]
    fn test_multiple_suffixes_in_order() {
        let chars = CharacterSet::new("ab");
        let candidates = build_candidates(&chars, 1, &suffixes(&[".app", ".dev"]));
        assert_eq!(candidates, vec!["a.app", "b.app", "a.dev", "b.dev"]);
    }

    // ── Estimates ───────────────────────────────────────────────────

    #[test]
    fn test_estimate() {
        let chars = CharacterSet::from_group("a-z0-9-");
        assert_eq!(estimate_candidate_count(&chars, 3, 1), 37usize.pow(3));
        assert_eq!(estimate_candidate_count(&chars, 3, 2), 2 * 37usize.pow(3));
        assert_eq!(estimate_candidate_count(&chars, 0, 1), 0);
    }

    #[test]
    fn test_estimate_saturates() {
        let chars = CharacterSet::from_group("a-z0-9-");
        assert_eq!(estimate_candidate_count(&chars, 64, 1), usize::MAX);
    }

    // ── Pipeline ────────────────────────────────────────────────────

    #[test]
    fn test_generate_candidates() {
        let config = GenerateConfig {
            chars: CharacterSet::new("ab"),
            length: 2,
            suffixes: suffixes(&[".app"]),
        };
        let result = generate_candidates(&config).unwrap();
        assert_eq!(result.candidates.len(), 4);
        assert_eq!(result.estimated_count, 4);
    }

    #[test]
    fn test_generate_rejects_empty_charset() {
        let config = GenerateConfig {
            chars: CharacterSet::new(""),
            ..Default::default()
        };
        let err = generate_candidates(&config).unwrap_err();
        assert!(matches!(err, DomainSweepError::ConfigError { .. }));
    }

    #[test]
    fn test_generate_rejects_missing_suffixes() {
        let config = GenerateConfig {
            suffixes: vec![],
            ..Default::default()
        };
        assert!(generate_candidates(&config).is_err());
    }
}
