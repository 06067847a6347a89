use crate::models::itinerary::GenerationRequest;
use crate::services::{
    cancellation::CancellationToken,
    itinerary_generation_service::{GenerationError, ItineraryGenerator},
    text_generation::TextGenerator,
};
use actix_web::{http::StatusCode, rt, web, HttpResponse, ResponseError};
use serde_json::json;
use std::panic;

impl ResponseError for GenerationError {
    fn status_code(&self) -> StatusCode {
        match self {
            GenerationError::Caller(_) => StatusCode::BAD_REQUEST,
            GenerationError::ProviderUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GenerationError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
            GenerationError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            GenerationError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            GenerationError::Caller(reason) => reason.clone(),
            GenerationError::ProviderUnavailable { .. } => {
                "The itinerary service is busy, please try again".to_string()
            }
            GenerationError::MalformedResponse { .. } => {
                "Something went wrong generating your plan".to_string()
            }
            GenerationError::Cancelled => "Itinerary generation was cancelled".to_string(),
            GenerationError::Configuration(_) => {
                "Server configuration error: itinerary generation unavailable".to_string()
            }
        };

        HttpResponse::build(self.status_code()).json(json!({
            "message": message,
            "code": self.code(),
            "retryable": self.is_retryable(),
        }))
    }
}

/*
    /api/itinerary/generate
*/
pub async fn generate<P: TextGenerator + 'static>(
    generator: web::Data<ItineraryGenerator<P>>,
    input: web::Json<GenerationRequest>,
) -> Result<HttpResponse, GenerationError> {
    let cancel = CancellationToken::new();
    let request = input.into_inner();

    // The pipeline runs as its own task. If the client disconnects, this
    // handler is dropped and the guard cancels the token the task is watching.
    let guard = cancel.clone().drop_guard();
    let task = rt::spawn(async move { generator.generate(&request, &cancel).await });

    let itinerary = match task.await {
        Ok(result) => result,
        Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
        Err(_) => Err(GenerationError::Cancelled),
    };
    guard.disarm();

    Ok(HttpResponse::Ok().json(itinerary?))
}

pub fn configure<P: TextGenerator + 'static>(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        GenerationError::Caller(format!("Invalid request body: {}", err)).into()
    });

    cfg.service(
        web::scope("/itinerary")
            .app_data(json_config)
            .route("/generate", web::post().to(generate::<P>)),
    );
}
