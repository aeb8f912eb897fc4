//! Keyword and synonym tables driving question resolution.
//!
//! Every classifier takes its vocabulary from a [`Lexicon`] injected at
//! construction. [`Lexicon::default`] carries the built-in English and Hindi
//! tables; [`Lexicon::from_path`] loads a JSON override where any omitted
//! table keeps its built-in value.

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::normalize::{fold, is_whole_word};

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("failed to read lexicon {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid lexicon JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("lexicon table `{0}` must not be empty")]
    EmptyTable(&'static str),

    #[error("invalid lexicon pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Vocabulary for intent, category, place and time extraction.
///
/// Terms are matched case-insensitively on whole words. A trailing `*` turns a
/// term into a prefix (`compar*` matches "compare" and "comparison").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    /// Comparison markers → COMPARE.
    pub compare: Vec<String>,
    /// Temporal-change markers → TREND.
    pub change: Vec<String>,
    /// Opening and closing halves of a "from … to" span → TREND.
    pub span_open: Vec<String>,
    pub span_close: Vec<String>,
    /// Severity terms; with a listing verb → LIST.
    pub severity: Vec<String>,
    pub list_verbs: Vec<String>,

    pub over_exploited: Vec<String>,
    pub critical: Vec<String>,
    /// Terms that veto the critical tier ("semi-critical" is not critical).
    pub critical_blockers: Vec<String>,
    pub semi_critical: Vec<String>,
    pub safe: Vec<String>,

    /// Whole-country scope markers.
    pub national: Vec<String>,

    /// "last", "past", … and the year nouns of a relative expression.
    pub relative_markers: Vec<String>,
    pub year_words: Vec<String>,

    /// Abbreviation → canonical state name. Keys written in upper case
    /// ("UP") only match upper case in the question; others match any case.
    pub state_synonyms: BTreeMap<String, String>,
}

fn terms(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Lexicon {
    fn default() -> Self {
        let state_synonyms = [
            ("UP", "Uttar Pradesh"),
            ("MP", "Madhya Pradesh"),
            ("AP", "Andhra Pradesh"),
            ("HP", "Himachal Pradesh"),
            ("TN", "Tamil Nadu"),
            ("WB", "West Bengal"),
            ("MH", "Maharashtra"),
            ("CG", "Chhattisgarh"),
            ("J&K", "Jammu and Kashmir"),
            ("JK", "Jammu and Kashmir"),
            ("orissa", "Odisha"),
            ("nct", "Delhi"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            compare: terms(&["vs", "versus", "compar*", "तुलना"]),
            change: terms(&[
                "since", "between", "trend*", "chang*", "रुझान", "बदलाव", "परिवर्तन",
            ]),
            span_open: terms(&["from", "से"]),
            span_close: terms(&["to", "till", "until", "तक"]),
            severity: terms(&[
                "over*", "critical*", "semi*", "safe*", "अति*", "गंभीर", "अर्ध*", "सुरक्षित",
            ]),
            list_verbs: terms(&["list*", "show*", "सूची", "दिखा*"]),
            over_exploited: terms(&[
                "over-exploit*",
                "overexploit*",
                "over exploit*",
                "अति-दोहित",
                "अतिदोहित",
                "अति दोहित",
            ]),
            critical: terms(&["critical", "गंभीर"]),
            critical_blockers: terms(&["semi*", "अर्ध*"]),
            semi_critical: terms(&["semi*", "अर्ध*"]),
            safe: terms(&["safe", "सुरक्षित"]),
            national: terms(&[
                "india",
                "national*",
                "nationwide",
                "country",
                "all states",
                "भारत",
                "देश",
            ]),
            relative_markers: terms(&["last", "past", "previous", "recent", "पिछले", "पिछला"]),
            year_words: terms(&["years", "year", "yrs", "yr", "साल", "सालों", "वर्ष", "वर्षों"]),
            state_synonyms,
        }
    }
}

impl Lexicon {
    /// Load a JSON lexicon. Tables missing from the file keep their defaults.
    pub fn from_path(path: &Path) -> Result<Self, LexiconError> {
        let raw = std::fs::read_to_string(path).map_err(|source| LexiconError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let lexicon = Self::from_json(&raw)?;
        info!(path = %path.display(), synonyms = lexicon.state_synonyms.len(), "loaded lexicon");
        Ok(lexicon)
    }

    pub fn from_json(raw: &str) -> Result<Self, LexiconError> {
        let lexicon: Self = serde_json::from_str(raw)?;
        lexicon.validate()?;
        Ok(lexicon)
    }

    /// Tables that feed compiled patterns cannot be empty.
    pub fn validate(&self) -> Result<(), LexiconError> {
        if self.relative_markers.iter().all(|t| t.trim().is_empty()) {
            return Err(LexiconError::EmptyTable("relative_markers"));
        }
        if self.year_words.iter().all(|t| t.trim().is_empty()) {
            return Err(LexiconError::EmptyTable("year_words"));
        }
        if self.span_open.is_empty() != self.span_close.is_empty() {
            return Err(LexiconError::EmptyTable(if self.span_open.is_empty() {
                "span_open"
            } else {
                "span_close"
            }));
        }
        Ok(())
    }
}

// ── Term matching ──

#[derive(Debug, Clone, PartialEq)]
struct Term {
    text: String,
    prefix: bool,
}

/// A compiled set of whole-word (or prefix) terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermSet {
    terms: Vec<Term>,
}

impl TermSet {
    pub fn new<S: AsRef<str>>(items: &[S]) -> Self {
        let terms = items
            .iter()
            .filter_map(|raw| {
                let folded = fold(raw.as_ref().trim());
                let (text, prefix) = match folded.strip_suffix('*') {
                    Some(stem) => (stem.to_string(), true),
                    None => (folded, false),
                };
                (!text.is_empty()).then_some(Term { text, prefix })
            })
            .collect();
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Does any term occur in already-folded `hay`?
    pub fn matches(&self, hay: &str) -> bool {
        self.find_from(hay, 0).is_some()
    }

    /// Earliest occurrence of any term at or after byte offset `from`.
    pub fn find_from(&self, hay: &str, from: usize) -> Option<Range<usize>> {
        self.terms
            .iter()
            .filter_map(|term| term.find_from(hay, from))
            .min_by_key(|r| (r.start, std::cmp::Reverse(r.end)))
    }
}

impl Term {
    fn find_from(&self, hay: &str, from: usize) -> Option<Range<usize>> {
        let tail = hay.get(from..)?;
        tail.match_indices(self.text.as_str())
            .map(|(i, m)| (from + i)..(from + i + m.len()))
            .find(|r| {
                if self.prefix {
                    // Only the leading edge has to sit on a word boundary.
                    !hay[..r.start].ends_with(char::is_alphanumeric)
                } else {
                    is_whole_word(hay, r.start, r.end)
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_word_terms() {
        let set = TermSet::new(&["vs", "list"]);
        assert!(set.matches("gujarat vs punjab"));
        assert!(set.matches("gujarat vs. punjab"));
        assert!(!set.matches("canvas"));
        assert!(!set.matches("enlisted"));
    }

    #[test]
    fn prefix_terms() {
        let set = TermSet::new(&["compar*"]);
        assert!(set.matches("a comparison of"));
        assert!(set.matches("compare"));
        assert!(!set.matches("incomparable"));
    }

    #[test]
    fn terms_are_case_folded() {
        let set = TermSet::new(&["Safe"]);
        assert!(set.matches("safe districts"));
    }

    #[test]
    fn find_from_returns_earliest() {
        let set = TermSet::new(&["to", "from"]);
        let hay = "from 2015 to 2020";
        assert_eq!(set.find_from(hay, 0), Some(0..4));
        assert_eq!(set.find_from(hay, 4), Some(10..12));
        assert_eq!(set.find_from(hay, 100), None);
    }

    #[test]
    fn devanagari_terms_match() {
        let set = TermSet::new(&["तुलना", "दिखा*"]);
        assert!(set.matches("गुजरात और पंजाब की तुलना"));
        assert!(set.matches("जिले दिखाओ"));
    }

    #[test]
    fn empty_terms_are_dropped() {
        let set = TermSet::new(&["", "  ", "*"]);
        assert!(set.is_empty());
        assert!(!set.matches("anything"));
    }

    #[test]
    fn json_override_keeps_defaults() {
        let lexicon = Lexicon::from_json(r#"{"compare": ["against"]}"#).unwrap();
        assert_eq!(lexicon.compare, vec!["against".to_string()]);
        assert_eq!(lexicon.safe, Lexicon::default().safe);
        assert_eq!(lexicon.state_synonyms["UP"], "Uttar Pradesh");
    }

    #[test]
    fn empty_relative_markers_rejected() {
        let err = Lexicon::from_json(r#"{"relative_markers": []}"#).unwrap_err();
        assert!(matches!(err, LexiconError::EmptyTable("relative_markers")));
    }

    #[test]
    fn from_path_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("lexicon.json");
        std::fs::write(&path, r#"{"state_synonyms": {"guj": "Gujarat"}}"#).unwrap();
        let lexicon = Lexicon::from_path(&path).unwrap();
        assert_eq!(lexicon.state_synonyms.len(), 1);
        assert_eq!(lexicon.state_synonyms["guj"], "Gujarat");
    }

    #[test]
    fn from_path_missing_file() {
        let err = Lexicon::from_path(Path::new("/nonexistent/lexicon.json")).unwrap_err();
        assert!(matches!(err, LexiconError::Io { .. }));
    }
}
