/// Arrow schema definitions for the groundwater assessment fact table.
pub mod assessment {
    use arrow::datatypes::{DataType, Field, Schema};

    /// Name of the fact table written by ingestion.
    pub const TABLE: &str = "gw_assessment_core";

    /// Columns every query shape may select from. `block` is optional in the
    /// source data and is not required.
    pub const REQUIRED_COLUMNS: &[&str] = &[
        "state",
        "district",
        "year",
        "recharge_mcm",
        "extractable_mcm",
        "extraction_mcm",
        "stage_pct",
        "category",
    ];

    /// Schema for the assessment fact table.
    pub fn assessment_schema() -> Schema {
        Schema::new(vec![
            Field::new("state", DataType::Utf8, false),
            Field::new("district", DataType::Utf8, false),
            Field::new("block", DataType::Utf8, true),
            Field::new("year", DataType::Int32, false),
            Field::new("recharge_mcm", DataType::Float64, true),
            Field::new("extractable_mcm", DataType::Float64, true),
            Field::new("extraction_mcm", DataType::Float64, true),
            Field::new("stage_pct", DataType::Float64, true),
            Field::new("category", DataType::Utf8, true),
        ])
    }

    /// Columns from [`REQUIRED_COLUMNS`] absent in `schema`.
    pub fn missing_columns(schema: &Schema) -> Vec<&'static str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| schema.field_with_name(c).is_err())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::assessment;
    use arrow::datatypes::{DataType, Field, Schema};

    #[test]
    fn assessment_schema_has_expected_fields() {
        let schema = assessment::assessment_schema();
        assert_eq!(schema.fields().len(), 9);
        assert!(schema.field_with_name("stage_pct").is_ok());
        assert!(schema.field_with_name("block").unwrap().is_nullable());
    }

    #[test]
    fn full_schema_misses_nothing() {
        let schema = assessment::assessment_schema();
        assert!(assessment::missing_columns(&schema).is_empty());
    }

    #[test]
    fn partial_schema_reports_missing() {
        let schema = Schema::new(vec![
            Field::new("state", DataType::Utf8, false),
            Field::new("district", DataType::Utf8, false),
            Field::new("year", DataType::Int64, false),
        ]);
        let missing = assessment::missing_columns(&schema);
        assert_eq!(
            missing,
            vec![
                "recharge_mcm",
                "extractable_mcm",
                "extraction_mcm",
                "stage_pct",
                "category"
            ]
        );
    }
}
