//! Resolution orchestrator: turns a question into an executed, bounded query.
//!
//! Stages run in order: normalize, deterministic parse, relative-year pass,
//! corrective re-parse (only for an unknown place with assistance enabled),
//! build and execute, then empty-result recovery. Recovery stops at the first
//! non-empty result and never fabricates rows.

mod answer;
mod error;

pub use answer::{Attempt, QueryAnswer, Stage};
pub use error::ResolveError;

use aquifer_ai::{Completion, CompletionError, corrective_parse, narrate};
use aquifer_core::{
    Aggregates, AssessmentRow, BuiltQuery, Lexicon, ParsedQuestion, Place, PlaceIndex,
    QuestionParser, StructuredQuery, YearRange, build_query, guard_statement, local_summary,
    relative_window,
};
use aquifer_store::AssessmentSource;
use chrono::Datelike;
use tracing::{debug, info, warn};

use crate::error::internal;

/// A place accepted from a corrective re-parse.
struct Correction {
    place: Place,
    years: Option<YearRange>,
}

/// Parse output plus the anchor it was resolved against.
struct Interpretation {
    parsed: ParsedQuestion,
    anchor: Option<i32>,
    corrective_tried: bool,
}

/// Anchor used when the store has no years at all.
fn current_year() -> i32 {
    chrono::Utc::now().year()
}

pub struct Resolver<S> {
    store: S,
    parser: QuestionParser,
    assist: Box<dyn Completion>,
}

impl<S: AssessmentSource> Resolver<S> {
    /// Build a resolver over `store`, indexing its known places once.
    pub fn new(store: S, lexicon: &Lexicon, assist: Box<dyn Completion>) -> Result<Self, ResolveError> {
        lexicon.validate()?;
        let places = store
            .known_places()
            .map_err(|e| internal("could not list known places", e))?;
        let parser = QuestionParser::new(lexicon, PlaceIndex::new(places))?;
        info!(
            states = parser.places().index().state_count(),
            districts = parser.places().index().district_count(),
            assist = assist.is_enabled(),
            "resolver ready"
        );
        Ok(Self {
            store,
            parser,
            assist,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn parser(&self) -> &QuestionParser {
        &self.parser
    }

    /// Resolve a question into a structured query without executing it.
    ///
    /// Relative year expressions are resolved against the latest year for
    /// the resolved place.
    pub async fn parse(&self, question: &str) -> Result<ParsedQuestion, ResolveError> {
        Ok(self.interpret(question).await?.parsed)
    }

    /// Execute a structured query as given. No recovery is attempted.
    pub async fn query(&self, structured: StructuredQuery) -> Result<QueryAnswer, ResolveError> {
        let mut query = structured;
        query.place = self.canonicalize(query.place)?;
        let anchor = self.anchor_for(&query.place)?;
        let built = build_query(&query, anchor);

        let mut attempts = Vec::new();
        let rows = self.execute(&built, Stage::Deterministic, &mut attempts)?;
        let question = format!("{} for {}", query.intent, query.place);
        Ok(self.answer(&question, query, built, rows, attempts).await)
    }

    /// Parse, execute, and recover from an empty result.
    pub async fn ask(&self, question: &str) -> Result<QueryAnswer, ResolveError> {
        let Interpretation {
            mut parsed,
            mut anchor,
            corrective_tried,
        } = self.interpret(question).await?;

        let mut attempts = Vec::new();
        let first = if parsed.corrected {
            Stage::Corrected
        } else {
            Stage::Deterministic
        };
        let mut built = build_query(&parsed.query, anchor);
        let mut rows = self.execute(&built, first, &mut attempts)?;

        // a. corrective guess, at most once per request
        if rows.is_empty()
            && !corrective_tried
            && self.assist.is_enabled()
            && let Some(correction) = self.correct(&parsed.text).await
        {
            accept(&mut parsed, correction);
            anchor = self.anchor_for(&parsed.query.place)?;
            apply_relative(&mut parsed, anchor);
            built = build_query(&parsed.query, anchor);
            rows = self.execute(&built, Stage::Corrected, &mut attempts)?;
        }

        // b. relative window against a moved anchor; only fires when the
        // store's latest year changed between lookups
        if rows.is_empty() && parsed.relative_years.is_some() {
            let current = self.anchor_for(&parsed.query.place)?;
            if current != anchor {
                debug!(?anchor, ?current, "anchor moved; rebuilding relative window");
                anchor = current;
                apply_relative(&mut parsed, anchor);
                built = build_query(&parsed.query, anchor);
                rows = self.execute(&built, Stage::Reanchored, &mut attempts)?;
            }
        }

        // c. empty is a valid answer
        if rows.is_empty() {
            info!(attempts = attempts.len(), "no rows after recovery");
        }
        Ok(self
            .answer(&parsed.text, parsed.query, built, rows, attempts)
            .await)
    }

    async fn interpret(&self, question: &str) -> Result<Interpretation, ResolveError> {
        let mut parsed = self.parser.parse(question);
        if parsed.text.is_empty() {
            return Err(ResolveError::Input);
        }
        info!(
            intent = %parsed.query.intent,
            place = %parsed.query.place,
            relative = ?parsed.relative_years,
            "deterministic parse"
        );

        let mut anchor = self.anchor_for(&parsed.query.place)?;
        apply_relative(&mut parsed, anchor);

        let mut corrective_tried = false;
        if parsed.query.place == Place::Unknown && self.assist.is_enabled() {
            corrective_tried = true;
            if let Some(correction) = self.correct(&parsed.text).await {
                accept(&mut parsed, correction);
                anchor = self.anchor_for(&parsed.query.place)?;
                apply_relative(&mut parsed, anchor);
            }
        }

        Ok(Interpretation {
            parsed,
            anchor,
            corrective_tried,
        })
    }

    /// Latest year for `place`, falling back to the global latest year.
    fn anchor_for(&self, place: &Place) -> Result<Option<i32>, ResolveError> {
        let scoped = match place {
            Place::District { state, district } => {
                self.store.latest_year(Some(state), Some(district))
            }
            Place::State { state } => self.store.latest_year(Some(state), None),
            Place::National | Place::Unknown => Ok(None),
        }
        .map_err(|e| internal("could not determine latest year", e))?;
        match scoped {
            Some(year) => Ok(Some(year)),
            None => self
                .store
                .latest_year(None, None)
                .map_err(|e| internal("could not determine latest year", e)),
        }
    }

    /// Replace a resolved place with its stored spelling when the store knows it.
    fn canonicalize(&self, place: Place) -> Result<Place, ResolveError> {
        let probe = match &place {
            Place::State { state } => self.store.canonical_place(state, None),
            Place::District { state, district } => {
                self.store.canonical_place(state, Some(district))
            }
            Place::National | Place::Unknown => return Ok(place),
        }
        .map_err(|e| internal("place lookup failed", e))?;
        Ok(probe.unwrap_or(place))
    }

    /// Ask the completion service for a place and confirm it against the store.
    ///
    /// Every failure here means "no correction".
    async fn correct(&self, text: &str) -> Option<Correction> {
        let states: Vec<&str> = self.parser.places().index().state_names().collect();
        let guess = match corrective_parse(self.assist.as_ref(), text, &states).await {
            Ok(guess) => guess,
            Err(CompletionError::Disabled) => return None,
            Err(e) => {
                warn!(error = %e, "corrective parse failed");
                return None;
            }
        };

        let probe = match guess.place? {
            Place::State { state } => self.store.canonical_place(&state, None),
            Place::District { state, district } => {
                self.store.canonical_place(&state, Some(&district))
            }
            Place::National | Place::Unknown => return None,
        };
        match probe {
            Ok(Some(place)) => {
                info!(place = %place, "corrective place accepted");
                Some(Correction {
                    place,
                    years: guess.years,
                })
            }
            Ok(None) => {
                info!("corrective place not in store; ignored");
                None
            }
            Err(e) => {
                warn!(error = %e, "place probe failed");
                None
            }
        }
    }

    fn execute(
        &self,
        built: &BuiltQuery,
        stage: Stage,
        attempts: &mut Vec<Attempt>,
    ) -> Result<Vec<AssessmentRow>, ResolveError> {
        let rendered = built.render();
        guard_statement(&rendered)?;
        let rows = self
            .store
            .run(built)
            .map_err(|e| internal("query execution failed", e))?;
        info!(stage = stage.as_str(), rows = rows.len(), "executed query");
        debug!(sql = %rendered);
        attempts.push(Attempt {
            stage,
            query_used: rendered,
            rows: rows.len(),
        });
        Ok(rows)
    }

    async fn answer(
        &self,
        question: &str,
        query: StructuredQuery,
        built: BuiltQuery,
        rows: Vec<AssessmentRow>,
        attempts: Vec<Attempt>,
    ) -> QueryAnswer {
        let aggregates = Aggregates::from_rows(&rows, &built.scope);
        let summary = local_summary(&query, &built.scope, &aggregates);
        let narrative = if self.assist.is_enabled() && !rows.is_empty() {
            match narrate(self.assist.as_ref(), question, &built.scope, &aggregates, &rows).await {
                Ok(text) if !text.is_empty() => Some(text),
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, "narrative summary unavailable");
                    None
                }
            }
        } else {
            None
        };

        QueryAnswer {
            query,
            query_used: built.render(),
            year_range_used: built.scope.years,
            rows,
            attempts,
            aggregates,
            summary,
            narrative,
        }
    }
}

/// Replace place (and, absent any year expression, years) wholesale.
fn accept(parsed: &mut ParsedQuestion, correction: Correction) {
    parsed.query.place = correction.place;
    if parsed.query.years.is_none() && parsed.relative_years.is_none() {
        parsed.query.years = correction.years;
    }
    parsed.corrected = true;
}

fn apply_relative(parsed: &mut ParsedQuestion, anchor: Option<i32>) {
    if let Some(span) = parsed.relative_years {
        parsed.query.years = Some(relative_window(span, anchor.unwrap_or_else(current_year)));
    }
}
