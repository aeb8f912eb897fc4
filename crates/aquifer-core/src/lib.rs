//! Core types and the deterministic half of question resolution.
//!
//! Everything here is pure: lexicon-driven extraction, place resolution
//! against a [`PlaceIndex`], statement construction, and result aggregates.
//! Storage lives in `aquifer-store`; the language-model stages in `aquifer-ai`.

pub mod aggregate;
pub mod category;
pub mod intent;
pub mod lexicon;
pub mod normalize;
pub mod parser;
pub mod place;
pub mod query;
pub mod record;
pub mod schema;
pub mod sql;
pub mod temporal;

pub use aggregate::{Aggregates, StageLeader, YearPoint, local_summary};
pub use lexicon::{Lexicon, LexiconError};
pub use parser::{ParsedQuestion, QuestionParser};
pub use place::{KnownPlace, PlaceIndex, PlaceResolver};
pub use query::{Intent, Place, ResolvedScope, StructuredQuery, YearRange};
pub use record::{AssessmentRecord, AssessmentRow, Category};
pub use schema::assessment;
pub use sql::{BuiltQuery, QueryRejected, SqlParam, build_query, guard_statement};
pub use temporal::relative_window;
