//! Place resolution: the narrowest unambiguous scope named in a question.
//!
//! Cascade, each step only when the previous found nothing:
//!
//! 1. state synonyms ("UP" → Uttar Pradesh)
//! 2. districts, longest name wins
//! 3. states by whole word, longest name wins
//! 4. states with all whitespace ignored
//! 5. national markers, else unknown
//!
//! Districts are tried before states so a district question is never widened
//! to its state.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::lexicon::{Lexicon, TermSet};
use crate::normalize::{alnum_len, bounded_by, fold, is_whole_word, strip_whitespace};
use crate::query::Place;

/// District names shorter than this (alphanumerics only) are never matched.
pub const MIN_DISTRICT_ALNUM: usize = 4;

/// A (state, district) pair known to the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct KnownPlace {
    pub state: String,
    pub district: String,
}

#[derive(Debug, Clone)]
struct NameMatcher {
    name: String,
    /// Name tokens joined by flexible separators, over folded text.
    word: Regex,
    /// Folded name with whitespace removed.
    stripped: String,
    len: usize,
}

impl NameMatcher {
    fn new(name: &str) -> Option<Self> {
        let folded = fold(name.trim());
        let tokens: Vec<String> = folded
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(regex::escape)
            .collect();
        if tokens.is_empty() {
            return None;
        }
        let word = Regex::new(&tokens.join(r"[^\p{L}\p{M}\p{N}]*")).ok()?;
        Some(Self {
            name: name.trim().to_string(),
            word,
            stripped: strip_whitespace(&folded),
            len: name.trim().chars().count(),
        })
    }

    /// Whole-word occurrence in folded text.
    fn word_match(&self, folded: &str) -> bool {
        let mut pos = 0;
        while pos <= folded.len() {
            let Some(m) = self.word.find_at(folded, pos) else {
                return false;
            };
            if is_whole_word(folded, m.start(), m.end()) {
                return true;
            }
            pos = m.start()
                + folded[m.start()..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
        }
        false
    }

    /// Occurrence in whitespace-stripped text not glued to other letters.
    fn stripped_match(&self, stripped: &str) -> bool {
        stripped
            .match_indices(self.stripped.as_str())
            .any(|(i, m)| bounded_by(stripped, i, i + m.len(), char::is_alphabetic))
    }
}

/// Longer names rank higher; equal lengths fall back to reverse lexical order
/// so the alphabetically first name wins under `max_by`.
fn longest_name(a: &&NameMatcher, b: &&NameMatcher) -> Ordering {
    a.len.cmp(&b.len).then_with(|| b.name.cmp(&a.name))
}

/// Matchers for every known district and state, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct PlaceIndex {
    districts: Vec<(String, NameMatcher)>,
    states: Vec<NameMatcher>,
}

impl PlaceIndex {
    pub fn new<I>(places: I) -> Self
    where
        I: IntoIterator<Item = KnownPlace>,
    {
        let places: BTreeSet<KnownPlace> = places.into_iter().collect();
        let state_names: BTreeSet<&str> = places.iter().map(|p| p.state.as_str()).collect();

        let districts = places
            .iter()
            .filter(|p| alnum_len(&p.district) >= MIN_DISTRICT_ALNUM)
            .filter_map(|p| NameMatcher::new(&p.district).map(|m| (p.state.clone(), m)))
            .collect();
        let states = state_names
            .into_iter()
            .filter_map(NameMatcher::new)
            .collect();

        Self { districts, states }
    }

    pub fn district_count(&self) -> usize {
        self.districts.len()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Known state names in lexical order.
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|m| m.name.as_str())
    }

    /// Stored spelling of a state, compared case-insensitively.
    pub fn find_state(&self, name: &str) -> Option<&str> {
        let wanted = fold(name.trim());
        self.states
            .iter()
            .find(|m| fold(&m.name) == wanted)
            .map(|m| m.name.as_str())
    }
}

/// Maps question text onto a [`Place`].
/// A state abbreviation from the lexicon.
#[derive(Debug, Clone)]
struct Synonym {
    term: String,
    state: String,
    /// Upper-case keys such as "UP" must appear upper case, so "up to 2020"
    /// never names a state.
    exact_case: bool,
}

impl Synonym {
    fn new(key: &str, state: &str) -> Option<Self> {
        let key = key.trim();
        let state = state.trim();
        if key.is_empty() || state.is_empty() {
            return None;
        }
        let exact_case =
            key.chars().any(char::is_uppercase) && !key.chars().any(char::is_lowercase);
        Some(Self {
            term: if exact_case { key.to_string() } else { fold(key) },
            state: state.to_string(),
            exact_case,
        })
    }

    fn found_in(&self, text: &str, folded: &str) -> bool {
        let hay = if self.exact_case { text } else { folded };
        hay.match_indices(self.term.as_str())
            .any(|(i, m)| is_whole_word(hay, i, i + m.len()))
    }
}

#[derive(Debug, Clone)]
pub struct PlaceResolver {
    /// Longest abbreviation first.
    synonyms: Vec<Synonym>,
    national: TermSet,
    index: PlaceIndex,
}

impl PlaceResolver {
    pub fn new(lexicon: &Lexicon, index: PlaceIndex) -> Self {
        let mut synonyms: Vec<Synonym> = lexicon
            .state_synonyms
            .iter()
            .filter_map(|(key, state)| Synonym::new(key, state))
            .collect();
        synonyms.sort_by(|a, b| {
            b.term
                .len()
                .cmp(&a.term.len())
                .then_with(|| a.term.cmp(&b.term))
        });

        Self {
            synonyms,
            national: TermSet::new(&lexicon.national),
            index,
        }
    }

    pub fn index(&self) -> &PlaceIndex {
        &self.index
    }

    /// Resolve normalized question text. Deterministic for identical input.
    pub fn resolve(&self, text: &str) -> Place {
        let folded = fold(text);
        let stripped = strip_whitespace(&folded);

        if let Some(state) = self.synonym(text, &folded) {
            debug!(state = %state, "place resolved by synonym");
            return Place::state(state);
        }
        if let Some((state, district)) = self.district(&folded, &stripped) {
            debug!(state = %state, district = %district, "place resolved to district");
            return Place::district(state, district);
        }
        if let Some(state) = self.state_by_word(&folded) {
            debug!(state = %state, "place resolved to state");
            return Place::state(state);
        }
        if let Some(state) = self.state_without_spaces(&stripped) {
            debug!(state = %state, "place resolved to state ignoring whitespace");
            return Place::state(state);
        }
        if self.national.matches(&folded) {
            return Place::National;
        }
        Place::Unknown
    }

    fn synonym(&self, text: &str, folded: &str) -> Option<String> {
        self.synonyms
            .iter()
            .filter(|syn| syn.found_in(text, folded))
            .find_map(|syn| {
                if self.index.state_count() == 0 {
                    Some(syn.state.clone())
                } else {
                    self.index.find_state(&syn.state).map(str::to_string)
                }
            })
    }

    fn district(&self, folded: &str, stripped: &str) -> Option<(String, String)> {
        let mentioned: Vec<&str> = self
            .index
            .states
            .iter()
            .filter(|m| m.word_match(folded))
            .map(|m| m.name.as_str())
            .collect();

        self.index
            .districts
            .iter()
            .filter(|(_, m)| m.word_match(folded) || m.stripped_match(stripped))
            .max_by(|(state_a, a), (state_b, b)| {
                a.len
                    .cmp(&b.len)
                    .then_with(|| {
                        mentioned
                            .contains(&state_a.as_str())
                            .cmp(&mentioned.contains(&state_b.as_str()))
                    })
                    .then_with(|| b.name.cmp(&a.name))
                    .then_with(|| state_b.cmp(state_a))
            })
            .map(|(state, m)| (state.clone(), m.name.clone()))
    }

    fn state_by_word(&self, folded: &str) -> Option<String> {
        self.index
            .states
            .iter()
            .filter(|m| m.word_match(folded))
            .max_by(longest_name)
            .map(|m| m.name.clone())
    }

    fn state_without_spaces(&self, stripped: &str) -> Option<String> {
        self.index
            .states
            .iter()
            .filter(|m| alnum_len(&m.name) >= MIN_DISTRICT_ALNUM)
            .filter(|m| stripped.contains(m.stripped.as_str()))
            .max_by(longest_name)
            .map(|m| m.name.clone())
    }
}
