//! Plain-text rendering for terminal output.

use std::fmt::Write;

use aquifer_core::{AssessmentRow, KnownPlace, ParsedQuestion};
use aquifer_resolve::QueryAnswer;

use crate::Status;

// ── Tables ──

/// Left-aligned columns padded to the widest cell.
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    line(headers, &widths, &mut out);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        line(&cells, &widths, &mut out);
    }
    out
}

fn line(cells: &[&str], widths: &[usize], out: &mut String) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, &w)| format!("{c:<w$}"))
        .collect();
    let _ = writeln!(out, "{}", padded.join("  ").trim_end());
}

fn num(value: Option<f64>) -> String {
    value.map_or_else(String::new, |v| format!("{v:.2}"))
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Only the columns that carry data in at least one row.
pub fn render_rows(rows: &[AssessmentRow]) -> String {
    type Cell = fn(&AssessmentRow) -> String;
    let columns: [(&str, Cell); 8] = [
        ("state", |r| text(&r.state)),
        ("district", |r| text(&r.district)),
        ("year", |r| r.year.map(|y| y.to_string()).unwrap_or_default()),
        ("recharge_mcm", |r| num(r.recharge_mcm)),
        ("extractable_mcm", |r| num(r.extractable_mcm)),
        ("extraction_mcm", |r| num(r.extraction_mcm)),
        ("stage_pct", |r| num(r.stage_pct)),
        ("category", |r| r.category.map(|c| c.as_str().to_string()).unwrap_or_default()),
    ];
    let shown: Vec<&(&str, Cell)> = columns
        .iter()
        .filter(|(_, cell)| rows.iter().any(|r| !cell(r).is_empty()))
        .collect();

    let headers: Vec<&str> = shown.iter().map(|(h, _)| *h).collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|r| shown.iter().map(|(_, cell)| cell(r)).collect())
        .collect();
    table(&headers, &body)
}

// ── Public API ──

pub fn render_parsed(parsed: &ParsedQuestion) -> String {
    let q = &parsed.query;
    let mut out = String::new();
    let _ = writeln!(out, "  {:<12} {}", "question", parsed.text);
    let _ = writeln!(out, "  {:<12} {}", "intent", q.intent);
    let _ = writeln!(out, "  {:<12} {} ({})", "place", q.place, q.place.level());
    if let Some(years) = q.years {
        let _ = writeln!(out, "  {:<12} {years}", "years");
    }
    if let Some(span) = parsed.relative_years {
        let _ = writeln!(out, "  {:<12} last {span}", "relative");
    }
    if let Some(category) = q.category {
        let _ = writeln!(out, "  {:<12} {category}", "category");
    }
    if parsed.corrected {
        let _ = writeln!(out, "  {:<12} yes", "corrected");
    }
    out
}

pub fn render_answer(answer: &QueryAnswer) -> String {
    let mut out = String::new();
    if answer.rows.is_empty() {
        out.push_str("(no rows)\n");
    } else {
        out.push_str(&render_rows(&answer.rows));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", answer.summary);
    if let Some(narrative) = &answer.narrative {
        let _ = writeln!(out);
        let _ = writeln!(out, "{narrative}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "query used: {}", answer.query_used);
    if answer.attempts.len() > 1 {
        let stages: Vec<&str> = answer.attempts.iter().map(|a| a.stage.as_str()).collect();
        let _ = writeln!(out, "attempts:   {}", stages.join(" → "));
    }
    out
}

pub fn render_places(places: &[KnownPlace]) -> String {
    let rows: Vec<Vec<String>> = places
        .iter()
        .map(|p| vec![p.state.clone(), p.district.clone()])
        .collect();
    table(&["state", "district"], &rows)
}

pub fn render_status(status: &Status) -> String {
    let mut out = String::new();
    if let Some(problem) = &status.problem {
        let _ = writeln!(out, "Not ready: {problem}");
        let _ = writeln!(out, "Run `aquifer import <parquet>` to load assessment data.");
        return out;
    }
    let _ = writeln!(out, "  {:<12} {}", "rows", status.rows);
    let _ = writeln!(out, "  {:<12} {}", "states", status.states);
    let _ = writeln!(out, "  {:<12} {}", "districts", status.districts);
    if let Some(year) = status.latest_year {
        let _ = writeln!(out, "  {:<12} {year}", "latest year");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquifer_core::{Category, Intent, Place, StructuredQuery, YearRange};

    fn row(district: &str, stage: f64) -> AssessmentRow {
        AssessmentRow {
            district: Some(district.into()),
            year: Some(2020),
            stage_pct: Some(stage),
            category: Category::from_stage(stage),
            ..Default::default()
        }
    }

    #[test]
    fn rows_table_hides_empty_columns() {
        let out = render_rows(&[row("Mehsana", 128.0), row("Surat", 45.0)]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "district  year  stage_pct  category");
        assert!(lines[1].starts_with("--------"));
        assert_eq!(lines[2], "Mehsana   2020  128.00     Over-Exploited");
        assert_eq!(lines[3], "Surat     2020  45.00      Safe");
    }

    #[test]
    fn parsed_card() {
        let parsed = ParsedQuestion {
            text: "pune last 3 years".into(),
            query: StructuredQuery {
                intent: Intent::Data,
                years: Some(YearRange::new(2020, 2022)),
                place: Place::district("Maharashtra", "Pune"),
                category: None,
            },
            relative_years: Some(3),
            corrected: false,
        };
        let out = render_parsed(&parsed);
        assert!(out.contains("  place        Pune, Maharashtra (district)"));
        assert!(out.contains("  years        2020-2022"));
        assert!(out.contains("  relative     last 3"));
        assert!(!out.contains("category"));
    }

    #[test]
    fn places_table() {
        let out = render_places(&[KnownPlace {
            state: "Goa".into(),
            district: "North Goa".into(),
        }]);
        assert_eq!(out.lines().nth(2), Some("Goa    North Goa"));
    }

    #[test]
    fn status_card() {
        let ready = Status {
            ready: true,
            problem: None,
            rows: 12,
            states: 2,
            districts: 9,
            latest_year: Some(2022),
        };
        let out = render_status(&ready);
        assert!(out.contains("  rows         12"));
        assert!(out.contains("  latest year  2022"));

        let missing = Status {
            ready: false,
            problem: Some("table gw_assessment_core is missing".into()),
            ..ready
        };
        assert!(render_status(&missing).starts_with("Not ready: table gw_assessment_core"));
    }
}
