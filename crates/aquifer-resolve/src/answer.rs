use aquifer_core::{Aggregates, AssessmentRow, StructuredQuery, YearRange};
use serde::Serialize;

/// Which stage produced an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Built from the deterministic parse.
    Deterministic,
    /// Built after a corrective re-parse supplied the place.
    Corrected,
    /// Rebuilt after the anchor year for a relative window moved.
    Reanchored,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::Corrected => "corrected",
            Self::Reanchored => "reanchored",
        }
    }
}

/// One executed statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    pub stage: Stage,
    pub query_used: String,
    pub rows: usize,
}

/// The final answer to a question or structured query.
///
/// `rows` may be empty; that is a valid answer, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    pub query: StructuredQuery,
    pub rows: Vec<AssessmentRow>,
    /// The last executed statement, with literals inlined.
    pub query_used: String,
    pub year_range_used: Option<YearRange>,
    pub attempts: Vec<Attempt>,
    pub aggregates: Aggregates,
    /// Deterministic summary, always present.
    pub summary: String,
    /// Service-written summary, when one was available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}
