//! Deterministic question parsing: normalize, then run the four extractors.

use serde::Serialize;

use crate::category::CategoryExtractor;
use crate::intent::IntentClassifier;
use crate::lexicon::{Lexicon, LexiconError};
use crate::normalize::{fold, normalize};
use crate::place::{PlaceIndex, PlaceResolver};
use crate::query::StructuredQuery;
use crate::temporal::TemporalResolver;

/// Output of the deterministic pass.
///
/// `query.years` holds explicit years only; a relative expression is kept in
/// `relative_years` until an anchor year is known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedQuestion {
    pub text: String,
    pub query: StructuredQuery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_years: Option<u8>,
    /// Set when the place came from a corrective re-parse.
    pub corrected: bool,
}

/// All extractors, built from one lexicon and the known places.
#[derive(Debug, Clone)]
pub struct QuestionParser {
    temporal: TemporalResolver,
    intent: IntentClassifier,
    category: CategoryExtractor,
    places: PlaceResolver,
}

impl QuestionParser {
    pub fn new(lexicon: &Lexicon, index: PlaceIndex) -> Result<Self, LexiconError> {
        Ok(Self {
            temporal: TemporalResolver::new(lexicon)?,
            intent: IntentClassifier::new(lexicon),
            category: CategoryExtractor::new(lexicon),
            places: PlaceResolver::new(lexicon, index),
        })
    }

    pub fn temporal(&self) -> &TemporalResolver {
        &self.temporal
    }

    pub fn places(&self) -> &PlaceResolver {
        &self.places
    }

    pub fn parse(&self, raw: &str) -> ParsedQuestion {
        let text = normalize(raw);
        let folded = fold(&text);

        let years = self.temporal.absolute(&folded);
        let relative_years = if years.is_none() {
            self.temporal.relative_span(&folded)
        } else {
            None
        };

        let query = StructuredQuery {
            intent: self.intent.classify(&folded),
            years,
            place: self.places.resolve(&text),
            category: self.category.extract(&folded),
        };
        ParsedQuestion {
            text,
            query,
            relative_years,
            corrected: false,
        }
    }
}
