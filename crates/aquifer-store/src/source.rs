use aquifer_core::{AssessmentRow, BuiltQuery, KnownPlace, Place};

use crate::StoreError;

/// Read access to the assessment fact table, as the resolver needs it.
pub trait AssessmentSource {
    /// Every distinct (state, district) pair.
    fn known_places(&self) -> Result<Vec<KnownPlace>, StoreError>;

    /// Latest year with data, narrowed to a state and district when given.
    ///
    /// `Ok(None)` when nothing matches.
    fn latest_year(
        &self,
        state: Option<&str>,
        district: Option<&str>,
    ) -> Result<Option<i32>, StoreError>;

    /// Existence probe for a place named outside the deterministic parser.
    ///
    /// Matches case-insensitively and returns the place spelled as stored.
    fn canonical_place(
        &self,
        state: &str,
        district: Option<&str>,
    ) -> Result<Option<Place>, StoreError>;

    /// Execute a built statement with its bound parameters.
    fn run(&self, query: &BuiltQuery) -> Result<Vec<AssessmentRow>, StoreError>;
}
