use crate::{
    middleware::auth::Claims,
    models::trip::{CreateTripRequest, ProgressUpdate, Trip},
    services::trip_service::{parse_object_id, TripError, TripService},
};
use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use log::error;
use mongodb::bson::oid::ObjectId;
use serde_json::json;

impl ResponseError for TripError {
    fn status_code(&self) -> StatusCode {
        match self {
            TripError::NotFound => StatusCode::NOT_FOUND,
            TripError::NotAuthorized => StatusCode::UNAUTHORIZED,
            TripError::InvalidActivityIndex | TripError::InvalidTrip(_) | TripError::InvalidId => {
                StatusCode::BAD_REQUEST
            }
            TripError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            TripError::Database(e) => {
                error!("Trip database error: {}", e);
                "Server Error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}

fn owner(claims: &Claims) -> Result<ObjectId, TripError> {
    ObjectId::parse_str(&claims.user_id).map_err(|_| TripError::NotAuthorized)
}

/*
    POST /api/trips
*/
pub async fn create(
    claims: web::ReqData<Claims>,
    trips: web::Data<TripService>,
    input: web::Json<CreateTripRequest>,
) -> Result<HttpResponse, TripError> {
    let trip = Trip::from_request(owner(&claims)?, input.into_inner())?;
    let created = trips.create(trip).await?;
    Ok(HttpResponse::Created().json(created))
}

/*
    GET /api/trips
*/
pub async fn list(
    claims: web::ReqData<Claims>,
    trips: web::Data<TripService>,
) -> Result<HttpResponse, TripError> {
    let found = trips.list_for_user(&owner(&claims)?).await?;
    Ok(HttpResponse::Ok().json(found))
}

/*
    GET /api/trips/{id}
*/
pub async fn get_by_id(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    trips: web::Data<TripService>,
) -> Result<HttpResponse, TripError> {
    let id = parse_object_id(&path.into_inner())?;
    let trip = trips.get(&id, &owner(&claims)?).await?;
    Ok(HttpResponse::Ok().json(trip))
}

/*
    PUT /api/trips/{id}/progress
*/
pub async fn update_progress(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    trips: web::Data<TripService>,
    input: web::Json<ProgressUpdate>,
) -> Result<HttpResponse, TripError> {
    let id = parse_object_id(&path.into_inner())?;
    let trip = trips
        .update_progress(&id, &owner(&claims)?, &input)
        .await?;
    Ok(HttpResponse::Ok().json(trip))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| TripError::InvalidTrip(err.to_string()).into());

    cfg.app_data(json_config)
        .route("", web::post().to(create))
        .route("", web::get().to(list))
        .route("/{id}", web::get().to(get_by_id))
        .route("/{id}/progress", web::put().to(update_progress));
}
