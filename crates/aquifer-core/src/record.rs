//! Groundwater assessment records shared between the store and the resolver.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stage below which a unit is safe.
pub const SAFE_BELOW: f64 = 70.0;
/// Stage below which a unit is semi-critical.
pub const SEMI_CRITICAL_BELOW: f64 = 90.0;
/// Highest stage still classed critical; above is over-exploited.
pub const CRITICAL_UP_TO: f64 = 100.0;

/// Severity classification of a district's stage of extraction.
///
/// The string forms match the values stored in the `category` column exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Safe")]
    Safe,
    #[serde(rename = "Semi-Critical")]
    SemiCritical,
    #[serde(rename = "Critical")]
    Critical,
    #[serde(rename = "Over-Exploited")]
    OverExploited,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Safe,
        Category::SemiCritical,
        Category::Critical,
        Category::OverExploited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "Safe",
            Self::SemiCritical => "Semi-Critical",
            Self::Critical => "Critical",
            Self::OverExploited => "Over-Exploited",
        }
    }

    /// Classify a stage-of-extraction percentage.
    ///
    /// Thresholds: below 70 is safe, below 90 semi-critical, up to and
    /// including 100 critical, anything above over-exploited.
    pub fn from_stage(stage_pct: f64) -> Option<Self> {
        if !stage_pct.is_finite() {
            return None;
        }
        Some(if stage_pct < SAFE_BELOW {
            Self::Safe
        } else if stage_pct < SEMI_CRITICAL_BELOW {
            Self::SemiCritical
        } else if stage_pct <= CRITICAL_UP_TO {
            Self::Critical
        } else {
            Self::OverExploited
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Accepts the canonical spelling case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownCategory(trimmed.to_string()))
    }
}

/// One row of the `gw_assessment_core` fact table.
///
/// Produced by the ingestion pipeline; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub state: String,
    pub district: String,
    pub block: Option<String>,
    pub year: i32,
    pub recharge_mcm: Option<f64>,
    pub extractable_mcm: Option<f64>,
    pub extraction_mcm: Option<f64>,
    pub stage_pct: Option<f64>,
    pub category: Option<Category>,
}

impl AssessmentRecord {
    /// Stage of extraction as stored, or derived from the volumes when the
    /// stored value is missing and extractable volume is positive.
    pub fn effective_stage(&self) -> Option<f64> {
        self.stage_pct.or_else(|| match (self.extraction_mcm, self.extractable_mcm) {
            (Some(extraction), Some(extractable)) if extractable > 0.0 => {
                Some(extraction / extractable * 100.0)
            }
            _ => None,
        })
    }

    /// Stored category, or the classification of [`effective_stage`](Self::effective_stage).
    pub fn effective_category(&self) -> Option<Category> {
        self.category
            .or_else(|| self.effective_stage().and_then(Category::from_stage))
    }
}

/// A row returned by a built query.
///
/// Query shapes select different column subsets, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recharge_mcm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extractable_mcm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_mcm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}
