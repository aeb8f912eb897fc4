//! Arrow batch extraction into [`AssessmentRow`]s.
//!
//! Columns are looked up by name and cast to the expected type, so integer
//! widths or string encodings chosen by the engine do not matter.

use arrow::array::{Array, ArrayRef, Float64Array, Int32Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use tracing::debug;

use aquifer_core::{AssessmentRow, Category, KnownPlace};

use crate::StoreError;

/// A named column cast to `ty`, or `None` when the batch lacks it.
fn column(batch: &RecordBatch, name: &str, ty: &DataType) -> Result<Option<ArrayRef>, StoreError> {
    match batch.schema().index_of(name) {
        Ok(idx) => Ok(Some(cast(batch.column(idx), ty)?)),
        Err(_) => Ok(None),
    }
}

fn get_string(col: &Option<ArrayRef>, row: usize) -> Option<String> {
    let arr = col.as_ref()?.as_any().downcast_ref::<StringArray>()?;
    if arr.is_null(row) {
        return None;
    }
    Some(arr.value(row).to_string())
}

fn get_i32(col: &Option<ArrayRef>, row: usize) -> Option<i32> {
    let arr = col.as_ref()?.as_any().downcast_ref::<Int32Array>()?;
    if arr.is_null(row) {
        return None;
    }
    Some(arr.value(row))
}

fn get_f64(col: &Option<ArrayRef>, row: usize) -> Option<f64> {
    let arr = col.as_ref()?.as_any().downcast_ref::<Float64Array>()?;
    if arr.is_null(row) {
        return None;
    }
    Some(arr.value(row))
}

/// Convert result batches into rows, in order.
pub fn assessment_rows(batches: &[RecordBatch]) -> Result<Vec<AssessmentRow>, StoreError> {
    let mut out = Vec::with_capacity(batches.iter().map(|b| b.num_rows()).sum());
    for batch in batches {
        let state = column(batch, "state", &DataType::Utf8)?;
        let district = column(batch, "district", &DataType::Utf8)?;
        let year = column(batch, "year", &DataType::Int32)?;
        let recharge = column(batch, "recharge_mcm", &DataType::Float64)?;
        let extractable = column(batch, "extractable_mcm", &DataType::Float64)?;
        let extraction = column(batch, "extraction_mcm", &DataType::Float64)?;
        let stage = column(batch, "stage_pct", &DataType::Float64)?;
        let category = column(batch, "category", &DataType::Utf8)?;

        for i in 0..batch.num_rows() {
            let category = get_string(&category, i).and_then(|raw| match raw.parse::<Category>() {
                Ok(c) => Some(c),
                Err(e) => {
                    debug!(error = %e, "dropping unrecognised category");
                    None
                }
            });
            out.push(AssessmentRow {
                state: get_string(&state, i),
                district: get_string(&district, i),
                year: get_i32(&year, i),
                recharge_mcm: get_f64(&recharge, i),
                extractable_mcm: get_f64(&extractable, i),
                extraction_mcm: get_f64(&extraction, i),
                stage_pct: get_f64(&stage, i),
                category,
            });
        }
    }
    Ok(out)
}

/// Extract (state, district) pairs, skipping rows where either is null.
pub fn known_places(batches: &[RecordBatch]) -> Result<Vec<KnownPlace>, StoreError> {
    let mut out = Vec::new();
    for batch in batches {
        let state = column(batch, "state", &DataType::Utf8)?;
        let district = column(batch, "district", &DataType::Utf8)?;
        for i in 0..batch.num_rows() {
            if let Some(state) = get_string(&state, i)
                && let Some(district) = get_string(&district, i)
            {
                out.push(KnownPlace { state, district });
            }
        }
    }
    Ok(out)
}

/// First value of the first column as an `i32`, if any.
pub fn scalar_i32(batches: &[RecordBatch]) -> Result<Option<i32>, StoreError> {
    let Some(batch) = batches.iter().find(|b| b.num_rows() > 0) else {
        return Ok(None);
    };
    let col = Some(cast(batch.column(0), &DataType::Int32)?);
    Ok(get_i32(&col, 0))
}
