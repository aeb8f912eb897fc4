//! Year extraction: explicit years and ranges first, then "last N years".

use std::sync::LazyLock;

use regex::Regex;

use crate::lexicon::{Lexicon, LexiconError};
use crate::query::YearRange;

static YEAR_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})\s*(?:-|–|to)\s*(\d{4})\b").expect("year range pattern")
});

static STANDALONE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("standalone year pattern"));

const NUMBER_WORDS: [&str; 10] = [
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
];

/// Longest relative span accepted ("last 10 years").
pub const MAX_RELATIVE_YEARS: u8 = 10;

/// Extracts year windows from folded question text.
#[derive(Debug, Clone)]
pub struct TemporalResolver {
    relative: Regex,
}

impl TemporalResolver {
    pub fn new(lexicon: &Lexicon) -> Result<Self, LexiconError> {
        let markers = alternation(&lexicon.relative_markers);
        let nouns = alternation(&lexicon.year_words);
        let numbers = NUMBER_WORDS.join("|");
        let edge = r"[^\p{L}\p{M}\p{N}]";
        let pattern = format!(
            r"(?:^|{edge})(?:{markers})\s+(\d{{1,2}}|{numbers})\s+(?:{nouns})(?:$|{edge})"
        );
        Ok(Self {
            relative: Regex::new(&pattern)?,
        })
    }

    /// Explicit years: a range if present, else min..max of standalone years.
    pub fn absolute(&self, folded: &str) -> Option<YearRange> {
        if let Some(caps) = YEAR_RANGE.captures(folded) {
            let a: i32 = caps[1].parse().ok()?;
            let b: i32 = caps[2].parse().ok()?;
            return Some(YearRange::new(a, b));
        }

        let years: Vec<i32> = STANDALONE_YEAR
            .find_iter(folded)
            .filter_map(|m| m.as_str().parse().ok())
            .collect();
        let min = years.iter().copied().min()?;
        let max = years.iter().copied().max()?;
        Some(YearRange::new(min, max))
    }

    /// N of the first "last N years" expression with 1 <= N <= 10.
    pub fn relative_span(&self, folded: &str) -> Option<u8> {
        self.relative
            .captures_iter(folded)
            .find_map(|caps| parse_count(&caps[1]))
    }

    /// Both passes: explicit years win; the relative pass needs an anchor.
    pub fn resolve(&self, folded: &str, anchor: Option<i32>) -> Option<YearRange> {
        self.absolute(folded).or_else(|| {
            let span = self.relative_span(folded)?;
            Some(relative_window(span, anchor?))
        })
    }
}

/// Window of `span` years ending at `anchor`.
pub fn relative_window(span: u8, anchor: i32) -> YearRange {
    let span = span.clamp(1, MAX_RELATIVE_YEARS);
    YearRange::new(anchor - (i32::from(span) - 1), anchor)
}

fn parse_count(raw: &str) -> Option<u8> {
    let n = match raw.parse::<u8>() {
        Ok(n) => n,
        Err(_) => NUMBER_WORDS.iter().position(|w| *w == raw)? as u8 + 1,
    };
    (1..=MAX_RELATIVE_YEARS).contains(&n).then_some(n)
}

fn alternation(items: &[String]) -> String {
    let mut folded: Vec<String> = items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    folded.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    folded.dedup();
    folded
        .iter()
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join("|")
}
