//! Seeded in-memory stores for tests across the workspace.
//!
//! Latest years differ per place on purpose: Gujarat stops at 2021, Pune at
//! 2022, and only Punjab reaches 2023.

use aquifer_core::schema::assessment::TABLE;
use aquifer_core::sql::quote_literal;
use aquifer_core::{AssessmentRecord, Category};

use crate::{DuckStore, StoreError};

fn record(state: &str, district: &str, year: i32, extractable: f64, extraction: f64) -> AssessmentRecord {
    let stage = extraction / extractable * 100.0;
    AssessmentRecord {
        state: state.to_string(),
        district: district.to_string(),
        block: None,
        year,
        recharge_mcm: Some(extractable / 0.9),
        extractable_mcm: Some(extractable),
        extraction_mcm: Some(extraction),
        stage_pct: Some(stage),
        category: Category::from_stage(stage),
    }
}

/// The rows [`seed`] inserts.
pub fn records() -> Vec<AssessmentRecord> {
    vec![
        record("Gujarat", "Mehsana", 2019, 800.0, 1004.0),
        record("Gujarat", "Mehsana", 2020, 800.0, 1024.0),
        record("Gujarat", "Mehsana", 2021, 800.0, 1041.6),
        record("Gujarat", "Banaskantha", 2020, 1000.0, 1403.0),
        record("Gujarat", "Ahmedabad", 2020, 600.0, 570.0),
        record("Gujarat", "Ahmedabad", 2021, 600.0, 585.0),
        record("Gujarat", "Surat", 2020, 1200.0, 540.0),
        record("Gujarat", "Kachchh", 2017, 500.0, 300.0),
        record("Maharashtra", "Pune", 2020, 900.0, 648.0),
        record("Maharashtra", "Pune", 2022, 900.0, 666.0),
        record("Maharashtra", "Pune Rural", 2022, 700.0, 567.0),
        record("Maharashtra", "Aurangabad", 2022, 650.0, 659.75),
        record("Bihar", "Aurangabad", 2022, 400.0, 160.0),
        record("Uttar Pradesh", "Lucknow", 2022, 500.0, 440.0),
        record("Punjab", "Ludhiana", 2020, 1100.0, 1760.0),
        record("Punjab", "Ludhiana", 2022, 1100.0, 1815.0),
        record("Punjab", "Ludhiana", 2023, 1100.0, 1870.0),
    ]
}

fn literal(value: Option<f64>) -> String {
    value.map_or_else(|| "NULL".to_string(), |v| v.to_string())
}

/// Create the fact table in `store` and insert [`records`].
pub fn seed(store: &DuckStore) -> Result<(), StoreError> {
    store.create_assessment_table()?;
    let values: Vec<String> = records()
        .iter()
        .map(|r| {
            format!(
                "({}, {}, NULL, {}, {}, {}, {}, {}, {})",
                quote_literal(&r.state),
                quote_literal(&r.district),
                r.year,
                literal(r.recharge_mcm),
                literal(r.extractable_mcm),
                literal(r.extraction_mcm),
                literal(r.stage_pct),
                r.category
                    .map_or_else(|| "NULL".to_string(), |c| quote_literal(c.as_str())),
            )
        })
        .collect();
    let sql = format!("INSERT INTO {TABLE} VALUES {}", values.join(", "));
    store.connection().execute_batch(&sql)?;
    Ok(())
}

/// An in-memory store holding [`records`].
pub fn seeded_store() -> Result<DuckStore, StoreError> {
    let store = DuckStore::open()?;
    seed(&store)?;
    Ok(store)
}
