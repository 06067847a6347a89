use crate::models::trip::{CreateTripRequest, ProgressUpdate, Trip};
use futures::TryStreamExt;
use log::{error, info};
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime, Document},
    options::ReturnDocument,
    Client, Collection,
};
use thiserror::Error;

pub const TRIPS_COLLECTION: &str = "Trips";

#[derive(Debug, Error)]
pub enum TripError {
    #[error("Trip not found")]
    NotFound,

    #[error("Not authorized")]
    NotAuthorized,

    #[error("Invalid activity index")]
    InvalidActivityIndex,

    #[error("Invalid trip data: {0}")]
    InvalidTrip(String),

    #[error("Invalid ID")]
    InvalidId,

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

impl Trip {
    pub fn from_request(owner: ObjectId, request: CreateTripRequest) -> Result<Self, TripError> {
        if request.duration == 0 {
            return Err(TripError::InvalidTrip(
                "duration must be at least one day".to_string(),
            ));
        }
        if request.budget.trim().is_empty() {
            return Err(TripError::InvalidTrip("budget is required".to_string()));
        }

        let now = DateTime::now();
        let start_date = request
            .start_date
            .map(|date| DateTime::from_millis(date.timestamp_millis()))
            .unwrap_or(now);

        Ok(Trip {
            id: None,
            user_id: owner,
            destination: request.destination,
            duration: request.duration,
            budget: request.budget,
            start_date,
            total_cost: request.total_cost.unwrap_or(0.0),
            itinerary: request.itinerary,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    pub fn ensure_owner(&self, user_id: &ObjectId) -> Result<(), TripError> {
        if &self.user_id == user_id {
            Ok(())
        } else {
            Err(TripError::NotAuthorized)
        }
    }

    /// Fails unless `day_index`/`activity_index` (0-based) name an activity.
    pub fn ensure_activity(&self, day_index: usize, activity_index: usize) -> Result<(), TripError> {
        self.itinerary
            .get(day_index)
            .and_then(|day| day.activities.get(activity_index))
            .map(|_| ())
            .ok_or(TripError::InvalidActivityIndex)
    }
}

/// `$set` for a single activity's flag. Other activities of the trip are not
/// part of the write.
pub fn progress_update_doc(update: &ProgressUpdate, now: DateTime) -> Document {
    let path = format!(
        "itinerary.{}.activities.{}.visited",
        update.day_index, update.activity_index
    );
    doc! { "$set": { path: update.visited, "updated_at": now } }
}

pub fn parse_object_id(raw: &str) -> Result<ObjectId, TripError> {
    ObjectId::parse_str(raw).map_err(|_| TripError::InvalidId)
}

#[derive(Clone)]
pub struct TripService {
    collection: Collection<Trip>,
}

impl TripService {
    pub fn new(client: &Client, database: &str) -> Self {
        Self {
            collection: client.database(database).collection(TRIPS_COLLECTION),
        }
    }

    pub async fn create(&self, mut trip: Trip) -> Result<Trip, TripError> {
        let result = self.collection.insert_one(&trip).await.map_err(|e| {
            error!("Failed to insert trip: {}", e);
            TripError::Database(e)
        })?;

        trip.id = result.inserted_id.as_object_id();
        info!(
            "Created trip {:?} for user {} ({} days)",
            trip.id, trip.user_id, trip.duration
        );
        Ok(trip)
    }

    /// Trips owned by `user_id`, newest first.
    pub async fn list_for_user(&self, user_id: &ObjectId) -> Result<Vec<Trip>, TripError> {
        let cursor = self
            .collection
            .find(doc! { "user_id": *user_id })
            .sort(doc! { "created_at": -1 })
            .await?;

        Ok(cursor.try_collect().await?)
    }

    pub async fn get(&self, id: &ObjectId, user_id: &ObjectId) -> Result<Trip, TripError> {
        let trip = self
            .collection
            .find_one(doc! { "_id": *id })
            .await?
            .ok_or(TripError::NotFound)?;

        trip.ensure_owner(user_id)?;
        Ok(trip)
    }

    pub async fn update_progress(
        &self,
        id: &ObjectId,
        user_id: &ObjectId,
        update: &ProgressUpdate,
    ) -> Result<Trip, TripError> {
        self.get(id, user_id)
            .await?
            .ensure_activity(update.day_index, update.activity_index)?;

        self.collection
            .find_one_and_update(
                doc! { "_id": *id, "user_id": *user_id },
                progress_update_doc(update, DateTime::now()),
            )
            .return_document(ReturnDocument::After)
            .await?
            .ok_or(TripError::NotFound)
    }
}
