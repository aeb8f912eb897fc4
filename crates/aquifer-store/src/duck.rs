//! DuckDB storage for the groundwater assessment fact table.

use std::collections::BTreeSet;
use std::path::Path;

use aquifer_core::record::{CRITICAL_UP_TO, SAFE_BELOW, SEMI_CRITICAL_BELOW};
use aquifer_core::schema::assessment::{self, REQUIRED_COLUMNS, TABLE};
use aquifer_core::sql::quote_literal;
use aquifer_core::{AssessmentRow, BuiltQuery, Category, KnownPlace, Place, SqlParam};
use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use duckdb::types::Value;
use duckdb::{Connection, params_from_iter};
use tracing::{debug, info};

use crate::{AssessmentSource, StoreError, rows};

/// Columns an import source may omit; they are derived from the volumes.
const DERIVABLE: &[&str] = &["stage_pct", "category"];

/// DuckDB store over `gw_assessment_core`.
///
/// The table is produced by the ingestion pipeline, either already inside a
/// DuckDB file or as a Parquet silver layer brought in with
/// [`import_parquet`](Self::import_parquet). Query paths never write.
///
/// Use [`open`](Self::open) for in-memory and [`open_persistent`](Self::open_persistent)
/// for a file-backed database.
pub struct DuckStore {
    conn: Connection,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Whether the fact table exists with every required column.
    pub fn has_assessment_table(&self) -> bool {
        self.require_assessment_table().is_ok()
    }

    /// Fail with [`StoreError::TableMissing`] unless the fact table is usable.
    pub fn require_assessment_table(&self) -> Result<(), StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT column_name FROM information_schema.columns WHERE table_name = ?")?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([TABLE])?.collect();
        let present = column_names(&batches)?;
        let missing: Vec<&'static str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !present.contains(*c))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::TableMissing {
                table: TABLE,
                missing,
            })
        }
    }

    /// Create an empty fact table if none exists.
    pub fn create_assessment_table(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(&create_table_sql())?;
        Ok(())
    }

    /// Load the fact table from Parquet, replacing any existing table.
    ///
    /// `path` is either a single file or a hive-partitioned directory
    /// (`year=YYYY/part.parquet`). Missing `stage_pct` values are derived from
    /// the volumes and missing categories from the stage.
    pub fn import_parquet(&self, path: &Path) -> Result<usize, StoreError> {
        if !path.exists() {
            return Err(StoreError::ParquetNotFound(path.to_path_buf()));
        }
        let source = if path.is_dir() {
            let glob = path.join("**").join("*.parquet");
            format!(
                "read_parquet({}, hive_partitioning = true)",
                quote_literal(&glob.display().to_string())
            )
        } else {
            format!("read_parquet({})", quote_literal(&path.display().to_string()))
        };

        let schema = {
            let mut stmt = self.conn.prepare(&format!("SELECT * FROM {source} LIMIT 0"))?;
            let arrow = stmt.query_arrow([])?;
            arrow.get_schema()
        };
        let missing: Vec<&'static str> = assessment::missing_columns(&schema)
            .into_iter()
            .filter(|c| !DERIVABLE.contains(c))
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::IncompleteSource {
                path: path.to_path_buf(),
                missing,
            });
        }

        let sql = format!(
            "CREATE OR REPLACE TABLE {TABLE} AS SELECT {} FROM {source}",
            import_columns(&schema)
        );
        debug!(%sql, "importing assessment table");
        self.conn.execute_batch(&sql)?;
        let count = self.assessment_count()?;
        info!(count, path = %path.display(), "loaded assessment table");
        Ok(count)
    }

    /// Number of rows in the fact table.
    pub fn assessment_count(&self) -> Result<usize, StoreError> {
        let sql = format!("SELECT count(*)::BIGINT AS cnt FROM {TABLE}");
        let mut stmt = self.conn.prepare(&sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        let batch = batches.first().ok_or(StoreError::NoResults)?;
        let col = batch
            .column(0)
            .as_any()
            .downcast_ref::<arrow::array::Int64Array>()
            .ok_or_else(|| StoreError::Other("count column not i64".into()))?;
        Ok(col.value(0) as usize)
    }

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }

    /// Execute `sql` with `params` bound in order to its placeholders.
    pub fn query_params(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<RecordBatch>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow(params_from_iter(bind(params)))?.collect();
        Ok(batches)
    }

    /// Access the underlying DuckDB connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl AssessmentSource for DuckStore {
    fn known_places(&self) -> Result<Vec<KnownPlace>, StoreError> {
        let sql = format!(
            "SELECT DISTINCT state, district FROM {TABLE} \
             WHERE state IS NOT NULL AND district IS NOT NULL \
             ORDER BY state, district"
        );
        let places = rows::known_places(&self.query_arrow(&sql)?)?;
        debug!(count = places.len(), "listed known places");
        Ok(places)
    }

    fn latest_year(
        &self,
        state: Option<&str>,
        district: Option<&str>,
    ) -> Result<Option<i32>, StoreError> {
        let mut filters = Vec::new();
        let mut params = Vec::new();
        if let Some(state) = state {
            filters.push("state = ?");
            params.push(SqlParam::Text(state.to_string()));
        }
        if let Some(district) = district {
            filters.push("district = ?");
            params.push(SqlParam::Text(district.to_string()));
        }
        let mut sql = format!("SELECT max(year)::INTEGER AS year FROM {TABLE}");
        if !filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&filters.join(" AND "));
        }
        rows::scalar_i32(&self.query_params(&sql, &params)?)
    }

    fn canonical_place(
        &self,
        state: &str,
        district: Option<&str>,
    ) -> Result<Option<Place>, StoreError> {
        let found = match district {
            Some(district) => {
                let sql = format!(
                    "SELECT state, district FROM {TABLE} \
                     WHERE lower(state) = lower(?) AND lower(district) = lower(?) \
                     ORDER BY state, district LIMIT 1"
                );
                let params = [
                    SqlParam::Text(state.trim().to_string()),
                    SqlParam::Text(district.trim().to_string()),
                ];
                rows::known_places(&self.query_params(&sql, &params)?)?
                    .into_iter()
                    .next()
                    .map(|p| Place::district(p.state, p.district))
            }
            None => {
                let sql = format!(
                    "SELECT DISTINCT state FROM {TABLE} \
                     WHERE lower(state) = lower(?) ORDER BY state LIMIT 1"
                );
                let params = [SqlParam::Text(state.trim().to_string())];
                rows::assessment_rows(&self.query_params(&sql, &params)?)?
                    .into_iter()
                    .find_map(|row| row.state)
                    .map(Place::state)
            }
        };
        debug!(state, ?district, confirmed = found.is_some(), "place probe");
        Ok(found)
    }

    fn run(&self, query: &BuiltQuery) -> Result<Vec<AssessmentRow>, StoreError> {
        let batches = self.query_params(&query.sql, &query.params)?;
        rows::assessment_rows(&batches)
    }
}

fn bind(params: &[SqlParam]) -> Vec<Value> {
    params
        .iter()
        .map(|p| match p {
            SqlParam::Text(s) => Value::Text(s.clone()),
            SqlParam::Int(n) => Value::BigInt(*n),
        })
        .collect()
}

fn column_names(batches: &[RecordBatch]) -> Result<BTreeSet<String>, StoreError> {
    let mut names = BTreeSet::new();
    for batch in batches {
        let col = cast(batch.column(0), &DataType::Utf8)?;
        let Some(arr) = col.as_any().downcast_ref::<StringArray>() else {
            continue;
        };
        for i in 0..arr.len() {
            if !arr.is_null(i) {
                names.insert(arr.value(i).to_string());
            }
        }
    }
    Ok(names)
}

fn sql_type(ty: &DataType) -> &'static str {
    match ty {
        DataType::Int32 => "INTEGER",
        DataType::Float64 => "DOUBLE",
        _ => "VARCHAR",
    }
}

fn create_table_sql() -> String {
    let schema = assessment::assessment_schema();
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| {
            let null = if f.is_nullable() { "" } else { " NOT NULL" };
            format!("{} {}{null}", f.name(), sql_type(f.data_type()))
        })
        .collect();
    format!("CREATE TABLE IF NOT EXISTS {TABLE} ({})", columns.join(", "))
}

/// `CASE` expression classifying `stage` with [`Category::from_stage`]'s thresholds.
fn category_case(stage: &str) -> String {
    format!(
        "CASE WHEN {stage} IS NULL THEN NULL \
         WHEN {stage} < {SAFE_BELOW} THEN {} \
         WHEN {stage} < {SEMI_CRITICAL_BELOW} THEN {} \
         WHEN {stage} <= {CRITICAL_UP_TO} THEN {} \
         ELSE {} END",
        quote_literal(Category::Safe.as_str()),
        quote_literal(Category::SemiCritical.as_str()),
        quote_literal(Category::Critical.as_str()),
        quote_literal(Category::OverExploited.as_str()),
    )
}

fn import_columns(schema: &Schema) -> String {
    let has = |name: &str| schema.field_with_name(name).is_ok();
    let derived_stage =
        "CAST(extraction_mcm AS DOUBLE) / nullif(CAST(extractable_mcm AS DOUBLE), 0) * 100";
    let stage = if has("stage_pct") {
        format!("coalesce(CAST(stage_pct AS DOUBLE), {derived_stage})")
    } else {
        derived_stage.to_string()
    };
    let category = if has("category") {
        format!("coalesce(CAST(category AS VARCHAR), {})", category_case(&stage))
    } else {
        category_case(&stage)
    };
    let block = if has("block") {
        "CAST(block AS VARCHAR)"
    } else {
        "NULL::VARCHAR"
    };
    [
        "CAST(state AS VARCHAR) AS state".to_string(),
        "CAST(district AS VARCHAR) AS district".to_string(),
        format!("{block} AS block"),
        "CAST(year AS INTEGER) AS year".to_string(),
        "CAST(recharge_mcm AS DOUBLE) AS recharge_mcm".to_string(),
        "CAST(extractable_mcm AS DOUBLE) AS extractable_mcm".to_string(),
        "CAST(extraction_mcm AS DOUBLE) AS extraction_mcm".to_string(),
        format!("{stage} AS stage_pct"),
        format!("{category} AS category"),
    ]
    .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use aquifer_core::{Intent, StructuredQuery, YearRange, build_query};

    #[test]
    fn open_in_memory() {
        let store = DuckStore::open().unwrap();
        let batches = store.query_arrow("SELECT 1 AS x").unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].num_rows(), 1);
    }

    #[test]
    fn missing_table_reported() {
        let store = DuckStore::open().unwrap();
        assert!(!store.has_assessment_table());
        match store.require_assessment_table() {
            Err(StoreError::TableMissing { table, missing }) => {
                assert_eq!(table, TABLE);
                assert_eq!(missing.len(), REQUIRED_COLUMNS.len());
            }
            other => panic!("expected TableMissing, got {other:?}"),
        }
    }

    #[test]
    fn incomplete_table_reported() {
        let store = DuckStore::open().unwrap();
        store
            .connection()
            .execute_batch(&format!("CREATE TABLE {TABLE} (state VARCHAR, district VARCHAR)"))
            .unwrap();
        let err = store.require_assessment_table().unwrap_err();
        assert!(err.to_string().contains("stage_pct"));
    }

    #[test]
    fn created_table_is_complete() {
        let store = DuckStore::open().unwrap();
        store.create_assessment_table().unwrap();
        assert!(store.has_assessment_table());
        assert_eq!(store.assessment_count().unwrap(), 0);
        assert_eq!(store.latest_year(None, None).unwrap(), None);
    }

    #[test]
    fn import_missing_path_errors() {
        let store = DuckStore::open().unwrap();
        let result = store.import_parquet(Path::new("/nonexistent/silver"));
        assert!(matches!(result, Err(StoreError::ParquetNotFound(_))));
    }

    #[test]
    fn known_places_sorted_and_distinct() {
        let store = fixtures::seeded_store().unwrap();
        let places = store.known_places().unwrap();
        let mut sorted = places.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(places, sorted);
        assert!(places.contains(&KnownPlace {
            state: "Gujarat".into(),
            district: "Mehsana".into(),
        }));
    }

    #[test]
    fn latest_year_by_scope() {
        let store = fixtures::seeded_store().unwrap();
        assert_eq!(store.latest_year(None, None).unwrap(), Some(2023));
        assert_eq!(store.latest_year(Some("Gujarat"), None).unwrap(), Some(2021));
        assert_eq!(
            store.latest_year(Some("Maharashtra"), Some("Pune")).unwrap(),
            Some(2022)
        );
        assert_eq!(store.latest_year(Some("Atlantis"), None).unwrap(), None);
    }

    #[test]
    fn canonical_place_probe() {
        let store = fixtures::seeded_store().unwrap();
        assert_eq!(
            store.canonical_place("gujarat", None).unwrap(),
            Some(Place::state("Gujarat"))
        );
        assert_eq!(
            store.canonical_place(" GUJARAT ", Some("mehsana")).unwrap(),
            Some(Place::district("Gujarat", "Mehsana"))
        );
        assert_eq!(store.canonical_place("Gujarat", Some("Pune")).unwrap(), None);
        assert_eq!(store.canonical_place("Atlantis", None).unwrap(), None);
    }

    #[test]
    fn run_binds_parameters() {
        let store = fixtures::seeded_store().unwrap();
        let query = StructuredQuery {
            intent: Intent::Trend,
            years: Some(YearRange::new(2019, 2020)),
            place: Place::district("Gujarat", "Mehsana"),
            category: None,
        };
        let rows = store.run(&build_query(&query, None)).unwrap();
        let years: Vec<_> = rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![Some(2019), Some(2020)]);
        assert!(rows.iter().all(|r| r.state.is_none() && r.stage_pct.is_some()));
    }

    #[test]
    fn quoted_names_do_not_break_execution() {
        let store = fixtures::seeded_store().unwrap();
        let query = StructuredQuery {
            intent: Intent::Data,
            years: None,
            place: Place::district("Gujarat", "Mehsana' OR '1'='1"),
            category: None,
        };
        let rows = store.run(&build_query(&query, Some(2020))).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn import_derives_stage_and_category() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("silver.parquet");
        let scratch = DuckStore::open().unwrap();
        let copy = format!(
            "COPY (SELECT 'Goa' AS state, 'North Goa' AS district, 2022 AS year, \
             10.0 AS recharge_mcm, 8.0 AS extractable_mcm, 4.0 AS extraction_mcm) \
             TO {} (FORMAT PARQUET)",
            quote_literal(&file.display().to_string())
        );
        if let Err(e) = scratch.connection().execute_batch(&copy) {
            eprintln!("skipping: parquet extension unavailable ({e})");
            return;
        }

        let store = DuckStore::open().unwrap();
        assert_eq!(store.import_parquet(&file).unwrap(), 1);
        assert!(store.has_assessment_table());
        let rows = rows::assessment_rows(
            &store
                .query_arrow(&format!("SELECT * FROM {TABLE}"))
                .unwrap(),
        )
        .unwrap();
        assert_eq!(rows[0].stage_pct, Some(50.0));
        assert_eq!(rows[0].category, Some(Category::Safe));
        assert_eq!(rows[0].year, Some(2022));
    }

    #[test]
    fn import_hive_partitioned_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let silver = tmp.path().join("silver");
        let seeded = fixtures::seeded_store().unwrap();
        let copy = format!(
            "COPY (SELECT * FROM {TABLE}) TO {} (FORMAT PARQUET, PARTITION_BY (year))",
            quote_literal(&silver.display().to_string())
        );
        if let Err(e) = seeded.connection().execute_batch(&copy) {
            eprintln!("skipping: parquet extension unavailable ({e})");
            return;
        }

        let store = DuckStore::open().unwrap();
        let count = store.import_parquet(&silver).unwrap();
        assert_eq!(count, seeded.assessment_count().unwrap());
        assert_eq!(store.latest_year(None, None).unwrap(), Some(2023));
    }

    #[test]
    fn import_rejects_incomplete_source() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("partial.parquet");
        let scratch = DuckStore::open().unwrap();
        let copy = format!(
            "COPY (SELECT 'Goa' AS state, 2022 AS year) TO {} (FORMAT PARQUET)",
            quote_literal(&file.display().to_string())
        );
        if scratch.connection().execute_batch(&copy).is_err() {
            return;
        }
        let store = DuckStore::open().unwrap();
        match store.import_parquet(&file) {
            Err(StoreError::IncompleteSource { missing, .. }) => {
                assert!(missing.contains(&"district"));
                assert!(!missing.contains(&"category"));
            }
            other => panic!("expected IncompleteSource, got {other:?}"),
        }
    }

    // ── Persistent storage ──

    #[test]
    fn persistent_table_survives_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("aquifer.duckdb");

        let store = DuckStore::open_persistent(&db_path).unwrap();
        assert!(db_path.exists());
        assert!(!store.has_assessment_table());
        fixtures::seed(&store).unwrap();
        let count = store.assessment_count().unwrap();
        drop(store);

        let store = DuckStore::open_persistent(&db_path).unwrap();
        assert!(store.has_assessment_table());
        assert_eq!(store.assessment_count().unwrap(), count);
    }

    #[test]
    fn category_case_matches_classifier() {
        let store = DuckStore::open().unwrap();
        for stage in [0.0, 69.9, 70.0, 89.9, 90.0, 100.0, 100.5, 180.0] {
            let sql = format!("SELECT {} AS category", category_case(&stage.to_string()));
            let rows = rows::assessment_rows(&store.query_arrow(&sql).unwrap()).unwrap();
            assert_eq!(rows[0].category, Category::from_stage(stage), "stage {stage}");
        }
    }
}
