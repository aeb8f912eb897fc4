//! Narrative summaries of a query result.

use std::fmt::Write;

use aquifer_core::{Aggregates, AssessmentRow, ResolvedScope};

use crate::{Completion, CompletionError};

/// Rows included verbatim in the prompt.
const SAMPLE_ROWS: usize = 20;

const SYSTEM: &str = "You are a hydrologist summarising Indian groundwater assessment results. \
Write two to four plain sentences. Use only the numbers given; do not invent data.";

pub fn narrative_prompt(
    question: &str,
    scope: &ResolvedScope,
    aggregates: &Aggregates,
    rows: &[AssessmentRow],
) -> String {
    let mut prompt = format!("Question: {question}\nScope: {}", scope.place);
    if let Some(years) = scope.years {
        let _ = write!(prompt, ", {years}");
    }
    let _ = write!(prompt, "\nRows: {}", aggregates.row_count);
    if let Some(mean) = aggregates.mean_stage_pct {
        let _ = write!(prompt, "\nMean stage of extraction: {mean:.1}%");
    }
    for (category, count) in &aggregates.category_counts {
        let _ = write!(prompt, "\n{category}: {count}");
    }
    prompt.push_str("\n\nstate | district | year | stage_pct | category");
    for row in rows.iter().take(SAMPLE_ROWS) {
        let _ = write!(
            prompt,
            "\n{} | {} | {} | {} | {}",
            row.state.as_deref().unwrap_or("-"),
            row.district.as_deref().unwrap_or("-"),
            row.year.map_or("-".to_string(), |y| y.to_string()),
            row.stage_pct.map_or("-".to_string(), |s| format!("{s:.1}")),
            row.category.map_or("-", |c| c.as_str()),
        );
    }
    prompt
}

/// Ask the service to summarise the result.
pub async fn narrate(
    completion: &dyn Completion,
    question: &str,
    scope: &ResolvedScope,
    aggregates: &Aggregates,
    rows: &[AssessmentRow],
) -> Result<String, CompletionError> {
    let prompt = narrative_prompt(question, scope, aggregates, rows);
    let text = completion.complete(SYSTEM, &prompt).await?;
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DisabledCompletion;
    use aquifer_core::{Category, Place, YearRange};

    fn sample() -> (ResolvedScope, Vec<AssessmentRow>) {
        let scope = ResolvedScope {
            place: Place::state("Gujarat"),
            years: Some(YearRange::single(2020)),
        };
        let rows = (0..30)
            .map(|i| AssessmentRow {
                state: Some("Gujarat".into()),
                district: Some(format!("D{i}")),
                year: Some(2020),
                stage_pct: Some(100.0 + f64::from(i)),
                category: Some(Category::OverExploited),
                ..Default::default()
            })
            .collect();
        (scope, rows)
    }

    #[test]
    fn prompt_is_bounded() {
        let (scope, rows) = sample();
        let agg = Aggregates::from_rows(&rows, &scope);
        let prompt = narrative_prompt("how bad is gujarat", &scope, &agg, &rows);
        assert!(prompt.starts_with("Question: how bad is gujarat\nScope: Gujarat, 2020"));
        assert!(prompt.contains("Rows: 30"));
        assert!(prompt.contains("Over-Exploited: 30"));
        assert!(prompt.contains("| D19 |"));
        assert!(!prompt.contains("| D20 |"));
    }

    #[tokio::test]
    async fn disabled_service_errors() {
        let (scope, rows) = sample();
        let agg = Aggregates::from_rows(&rows, &scope);
        let result = narrate(&DisabledCompletion, "q", &scope, &agg, &rows).await;
        assert!(matches!(result, Err(CompletionError::Disabled)));
    }
}
