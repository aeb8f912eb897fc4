//! Bounded SQL construction for a [`StructuredQuery`].
//!
//! Statements are built with `?` placeholders and executed with bound
//! parameters. [`BuiltQuery::render`] inlines the values, quote-escaped, for
//! display as the "query used".

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::query::{Intent, Place, ResolvedScope, StructuredQuery, YearRange};
use crate::schema::assessment::TABLE;

/// Row cap for state-level queries.
pub const STATE_LIMIT: usize = 500;
/// Row cap for national (and unresolved) queries.
pub const NATIONAL_LIMIT: usize = 50;

const DISTRICT_COLUMNS: &str =
    "year, recharge_mcm, extractable_mcm, extraction_mcm, stage_pct, category";
const STATE_COLUMNS: &str =
    "state, district, year, recharge_mcm, extractable_mcm, extraction_mcm, stage_pct, category";
const NATIONAL_COLUMNS: &str = "state, district, year, stage_pct, category";

static CHAINED_STATEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r";\s*\S").expect("chained statement pattern"));

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    Text(String),
    Int(i64),
}

impl SqlParam {
    fn render(&self) -> String {
        match self {
            Self::Text(s) => quote_literal(s),
            Self::Int(n) => n.to_string(),
        }
    }
}

/// A statement ready for execution plus the scope it covers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
    pub scope: ResolvedScope,
}

impl BuiltQuery {
    /// The statement with every parameter inlined as a literal.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.sql.len() + 16 * self.params.len());
        let mut params = self.params.iter();
        for ch in self.sql.chars() {
            if ch != '?' {
                out.push(ch);
                continue;
            }
            match params.next() {
                Some(p) => out.push_str(&p.render()),
                None => out.push('?'),
            }
        }
        out
    }
}

/// Single-quote a literal, doubling embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("statement rejected: terminator followed by further content")]
pub struct QueryRejected {
    pub statement: String,
}

/// Reject a statement terminator followed by more non-whitespace content.
///
/// A bare trailing terminator passes.
pub fn guard_statement(statement: &str) -> Result<(), QueryRejected> {
    if CHAINED_STATEMENT.is_match(statement) {
        return Err(QueryRejected {
            statement: statement.to_string(),
        });
    }
    Ok(())
}

/// Build the statement for `query`.
///
/// The year scope is the explicit range when present, else `anchor` (the
/// latest year for the place, or globally for national scope). Without an
/// anchor the statement selects the latest year itself.
pub fn build_query(query: &StructuredQuery, anchor: Option<i32>) -> BuiltQuery {
    let mut params = Vec::new();

    let (sql, years) = match &query.place {
        Place::District { state, district } => {
            params.push(SqlParam::Text(state.clone()));
            params.push(SqlParam::Text(district.clone()));
            let window = query.years.or(anchor.map(YearRange::single));
            let year = year_condition(window, &query.place, &mut params);
            let sql = format!(
                "SELECT {DISTRICT_COLUMNS} FROM {TABLE} \
                 WHERE state = ? AND district = ? AND {year} \
                 ORDER BY year ASC"
            );
            (sql, window)
        }
        Place::State { state } => {
            params.push(SqlParam::Text(state.clone()));
            let mut filters = vec!["state = ?".to_string()];
            if query.intent == Intent::List
                && let Some(category) = query.category
            {
                filters.push("category = ?".to_string());
                params.push(SqlParam::Text(category.as_str().to_string()));
            }
            let window = query.years.or(anchor.map(YearRange::single));
            filters.push(year_condition(window, &query.place, &mut params));
            let sql = format!(
                "SELECT {STATE_COLUMNS} FROM {TABLE} \
                 WHERE {} \
                 ORDER BY stage_pct DESC NULLS LAST, district ASC \
                 LIMIT {STATE_LIMIT}",
                filters.join(" AND ")
            );
            (sql, window)
        }
        Place::National | Place::Unknown => {
            let window = anchor.map(YearRange::single);
            let year = match window {
                Some(w) => {
                    params.push(SqlParam::Int(i64::from(w.end())));
                    "year = ?".to_string()
                }
                None => format!("year = (SELECT max(year) FROM {TABLE})"),
            };
            let sql = format!(
                "SELECT {NATIONAL_COLUMNS} FROM {TABLE} \
                 WHERE {year} \
                 ORDER BY stage_pct DESC NULLS LAST, state ASC, district ASC \
                 LIMIT {NATIONAL_LIMIT}"
            );
            (sql, window)
        }
    };

    BuiltQuery {
        sql,
        params,
        scope: ResolvedScope {
            place: query.place.clone(),
            years,
        },
    }
}

fn year_condition(window: Option<YearRange>, place: &Place, params: &mut Vec<SqlParam>) -> String {
    if let Some(w) = window {
        params.push(SqlParam::Int(i64::from(w.start())));
        params.push(SqlParam::Int(i64::from(w.end())));
        return "year BETWEEN ? AND ?".to_string();
    }

    let mut filters = Vec::new();
    if let Some(state) = place.state_name() {
        filters.push("state = ?");
        params.push(SqlParam::Text(state.to_string()));
    }
    if let Some(district) = place.district_name() {
        filters.push("district = ?");
        params.push(SqlParam::Text(district.to_string()));
    }
    if filters.is_empty() {
        format!("year = (SELECT max(year) FROM {TABLE})")
    } else {
        format!(
            "year = (SELECT max(year) FROM {TABLE} WHERE {})",
            filters.join(" AND ")
        )
    }
}
