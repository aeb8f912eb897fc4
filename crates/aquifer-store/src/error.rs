use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table {table} is missing or incomplete (missing columns: {})", .missing.join(", "))]
    TableMissing {
        table: &'static str,
        missing: Vec<&'static str>,
    },

    #[error("parquet source not found: {0}")]
    ParquetNotFound(std::path::PathBuf),

    #[error("import source {path} lacks columns: {}", .missing.join(", "))]
    IncompleteSource {
        path: std::path::PathBuf,
        missing: Vec<&'static str>,
    },

    #[error("no results for query")]
    NoResults,

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("{0}")]
    Other(String),
}
