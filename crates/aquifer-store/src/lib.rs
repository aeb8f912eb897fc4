//! Storage layer: the DuckDB-backed groundwater assessment fact table.

mod error;
pub use error::StoreError;

pub mod rows;
mod source;
pub use source::AssessmentSource;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

#[cfg(all(feature = "duckdb", any(test, feature = "fixtures")))]
pub mod fixtures;
