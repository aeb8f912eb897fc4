//! The structured form a question resolves into.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::Category;

/// What the question asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    List,
    Data,
    Trend,
    Compare,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "LIST",
            Self::Data => "DATA",
            Self::Trend => "TREND",
            Self::Compare => "COMPARE",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive year window. Always `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct YearRange {
    y1: i32,
    y2: i32,
}

impl YearRange {
    /// Build a window from two bounds in either order.
    pub fn new(a: i32, b: i32) -> Self {
        Self {
            y1: a.min(b),
            y2: a.max(b),
        }
    }

    pub fn single(year: i32) -> Self {
        Self { y1: year, y2: year }
    }

    pub fn start(&self) -> i32 {
        self.y1
    }

    pub fn end(&self) -> i32 {
        self.y2
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.y1..=self.y2).contains(&year)
    }
}

impl<'de> Deserialize<'de> for YearRange {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            y1: i32,
            y2: i32,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(YearRange::new(raw.y1, raw.y2))
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.y1 == self.y2 {
            write!(f, "{}", self.y1)
        } else {
            write!(f, "{}-{}", self.y1, self.y2)
        }
    }
}

/// Geographic scope of a question.
///
/// A district always carries its state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "lowercase")]
pub enum Place {
    #[default]
    Unknown,
    National,
    State {
        state: String,
    },
    District {
        state: String,
        district: String,
    },
}

impl Place {
    pub fn state(state: impl Into<String>) -> Self {
        Self::State {
            state: state.into(),
        }
    }

    pub fn district(state: impl Into<String>, district: impl Into<String>) -> Self {
        Self::District {
            state: state.into(),
            district: district.into(),
        }
    }

    pub fn level(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::National => "national",
            Self::State { .. } => "state",
            Self::District { .. } => "district",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    pub fn state_name(&self) -> Option<&str> {
        match self {
            Self::State { state } | Self::District { state, .. } => Some(state),
            _ => None,
        }
    }

    pub fn district_name(&self) -> Option<&str> {
        match self {
            Self::District { district, .. } => Some(district),
            _ => None,
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::National => f.write_str("India"),
            Self::State { state } => f.write_str(state),
            Self::District { state, district } => write!(f, "{district}, {state}"),
        }
    }
}

/// A question resolved into intent, time window, place, and category.
///
/// Corrections replace `place` and `years` wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuery {
    pub intent: Intent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years: Option<YearRange>,
    #[serde(default)]
    pub place: Place,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl StructuredQuery {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            years: None,
            place: Place::Unknown,
            category: None,
        }
    }
}

/// The concrete window and place a query was built against.
///
/// `years` is absent only when no anchor year was known and the statement
/// fell back to a latest-year subquery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedScope {
    pub place: Place,
    pub years: Option<YearRange>,
}
