use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::lenient;

/// Longest trip the planner will generate.
pub const MAX_DAYS: u32 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BudgetTier {
    Low,
    Medium,
    High,
}

impl BudgetTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetTier::Low => "Low",
            BudgetTier::Medium => "Medium",
            BudgetTier::High => "High",
        }
    }
}

impl fmt::Display for BudgetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(BudgetTier::Low),
            "medium" => Ok(BudgetTier::Medium),
            "high" => Ok(BudgetTier::High),
            other => Err(format!(
                "unknown budget tier '{}', expected Low, Medium or High",
                other
            )),
        }
    }
}

/// Body of `POST /api/itinerary/generate`.
///
/// Fields are loose on the wire so that a missing or out-of-range value is
/// reported as a caller error by [`GenerationRequest::validate`] instead of a
/// deserialization failure. `days` may arrive as a number or a numeric string.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GenerationRequest {
    pub destination: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_int")]
    pub days: Option<i64>,
    pub budget: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

/// A request that passed pre-flight checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub destination: Option<String>,
    pub days: u32,
    pub budget: BudgetTier,
    pub interests: Vec<String>,
}

impl GenerationRequest {
    pub fn validate(&self) -> Result<ValidatedRequest, String> {
        let days = match self.days {
            None => return Err("Please provide days and budget".to_string()),
            Some(days) if days <= 0 => {
                return Err(format!("days must be a positive integer, got {}", days))
            }
            Some(days) if days > i64::from(MAX_DAYS) => {
                return Err(format!("days must be at most {}, got {}", MAX_DAYS, days))
            }
            Some(days) => u32::try_from(days).map_err(|_| format!("days is too large: {}", days))?,
        };

        let budget = match self.budget.as_deref().map(str::trim) {
            None | Some("") => return Err("Please provide days and budget".to_string()),
            Some(budget) => budget.parse::<BudgetTier>()?,
        };

        let destination = self
            .destination
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let interests = self
            .interests
            .iter()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
            .map(str::to_string)
            .collect();

        Ok(ValidatedRequest {
            destination,
            days,
            budget,
            interests,
        })
    }
}

/// One scheduled item of a generated day.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Activity {
    pub time: String,
    pub activity: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub cost: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DayPlan {
    pub day: u32,
    pub activities: Vec<Activity>,
}

/// Generated multi-day plan. Serializes as a bare JSON array of days.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Itinerary {
    pub days: Vec<DayPlan>,
}

impl Itinerary {
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
