//! Chart and summary aggregates derived from result rows.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::query::{Intent, ResolvedScope, StructuredQuery};
use crate::record::{AssessmentRow, Category};

/// The highest stage of extraction among the rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageLeader {
    pub place: String,
    pub year: Option<i32>,
    pub stage_pct: f64,
}

/// Mean stage for one year (line chart point).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearPoint {
    pub year: i32,
    pub mean_stage_pct: f64,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregates {
    pub row_count: usize,
    /// Rows per category (bar/pie chart).
    pub category_counts: BTreeMap<Category, usize>,
    pub mean_stage_pct: Option<f64>,
    pub worst: Option<StageLeader>,
    /// Ascending by year.
    pub by_year: Vec<YearPoint>,
}

impl Aggregates {
    pub fn from_rows(rows: &[AssessmentRow], scope: &ResolvedScope) -> Self {
        let mut category_counts = BTreeMap::new();
        let mut stage_sum = 0.0;
        let mut stage_n = 0usize;
        let mut worst: Option<StageLeader> = None;
        let mut years: BTreeMap<i32, (f64, usize)> = BTreeMap::new();

        for row in rows {
            if let Some(category) = row.category {
                *category_counts.entry(category).or_insert(0) += 1;
            }
            let Some(stage) = row.stage_pct.filter(|s| s.is_finite()) else {
                continue;
            };
            stage_sum += stage;
            stage_n += 1;

            if let Some(year) = row.year {
                let slot = years.entry(year).or_insert((0.0, 0));
                slot.0 += stage;
                slot.1 += 1;
            }

            if worst.as_ref().is_none_or(|w| stage > w.stage_pct) {
                worst = Some(StageLeader {
                    place: row_label(row, scope),
                    year: row.year,
                    stage_pct: stage,
                });
            }
        }

        let by_year = years
            .into_iter()
            .map(|(year, (sum, n))| YearPoint {
                year,
                mean_stage_pct: sum / n as f64,
                rows: n,
            })
            .collect();

        Self {
            row_count: rows.len(),
            category_counts,
            mean_stage_pct: (stage_n > 0).then(|| stage_sum / stage_n as f64),
            worst,
            by_year,
        }
    }
}

fn row_label(row: &AssessmentRow, scope: &ResolvedScope) -> String {
    match (&row.district, &row.state) {
        (Some(d), Some(s)) => format!("{d}, {s}"),
        (Some(d), None) => d.clone(),
        (None, Some(s)) => s.clone(),
        (None, None) => scope.place.to_string(),
    }
}

/// Deterministic prose summary used when no narrative service is available.
pub fn local_summary(query: &StructuredQuery, scope: &ResolvedScope, agg: &Aggregates) -> String {
    let period = scope
        .years
        .map(|y| y.to_string())
        .unwrap_or_else(|| "latest year".to_string());

    if agg.row_count == 0 {
        return format!("No assessment data found for {} ({period}).", scope.place);
    }

    let mut out = format!(
        "{} record{} for {} ({period})",
        agg.row_count,
        if agg.row_count == 1 { "" } else { "s" },
        scope.place
    );
    if let Some(category) = query.category
        && query.intent == Intent::List
    {
        let _ = write!(out, " classified {category}");
    }
    out.push('.');

    if let Some(mean) = agg.mean_stage_pct {
        let _ = write!(out, " Mean stage of extraction {mean:.1}%.");
    }
    if let Some(w) = &agg.worst {
        let _ = write!(out, " Highest {:.1}% in {}", w.stage_pct, w.place);
        if let Some(year) = w.year {
            let _ = write!(out, " ({year})");
        }
        out.push('.');
    }
    if let (Some(first), Some(last)) = (agg.by_year.first(), agg.by_year.last())
        && agg.by_year.len() > 1
    {
        let _ = write!(
            out,
            " Stage moved from {:.1}% in {} to {:.1}% in {}.",
            first.mean_stage_pct, first.year, last.mean_stage_pct, last.year
        );
    }
    if !agg.category_counts.is_empty() {
        let parts: Vec<String> = agg
            .category_counts
            .iter()
            .rev()
            .map(|(c, n)| format!("{c} {n}"))
            .collect();
        let _ = write!(out, " Categories: {}.", parts.join(", "));
    }
    out
}
