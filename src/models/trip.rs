use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::itinerary::{Activity, DayPlan, Itinerary};
use super::lenient;

/// An activity as stored on a trip. The generated fields are kept as-is and
/// the `visited` flag sits next to them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrackedActivity {
    #[serde(flatten)]
    pub activity: Activity,
    #[serde(default)]
    pub visited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrackedDayPlan {
    pub day: u32,
    pub activities: Vec<TrackedActivity>,
}

impl From<DayPlan> for TrackedDayPlan {
    fn from(plan: DayPlan) -> Self {
        Self {
            day: plan.day,
            activities: plan
                .activities
                .into_iter()
                .map(|activity| TrackedActivity {
                    activity,
                    visited: false,
                })
                .collect(),
        }
    }
}

impl From<Itinerary> for Vec<TrackedDayPlan> {
    fn from(itinerary: Itinerary) -> Self {
        itinerary.days.into_iter().map(TrackedDayPlan::from).collect()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Trip {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub destination: Option<String>,
    pub duration: u32,
    pub budget: String,
    pub start_date: DateTime,
    #[serde(default)]
    pub total_cost: f64,
    pub itinerary: Vec<TrackedDayPlan>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

/*
    POST /api/trips body
*/
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripRequest {
    pub destination: Option<String>,
    #[serde(deserialize_with = "lenient::u32_from_int_or_string")]
    pub duration: u32,
    pub budget: String,
    #[serde(default)]
    pub itinerary: Vec<TrackedDayPlan>,
    pub total_cost: Option<f64>,
    pub start_date: Option<ChronoDateTime<Utc>>,
}

/*
    PUT /api/trips/{id}/progress body
*/
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub day_index: usize,
    pub activity_index: usize,
    pub visited: bool,
}
