use std::{env, io};

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::info;

use trip_planner_api::{
    db::mongo::{create_mongo_client, DEFAULT_DATABASE},
    middleware::auth::AuthMiddleware,
    routes,
    services::{
        gemini_service::GeminiClient,
        itinerary_generation_service::{GenerationConfig, ItineraryGenerator},
        trip_service::TripService,
    },
};

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;

#[actix_web::main]
async fn main() -> io::Result<()> {
    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let host = env::var("HOST").unwrap_or_else(|_| HOST.to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| PORT.to_string())
        .parse()
        .unwrap_or(PORT);

    let mongo_uri = env::var("MONGODB_URI")
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "MONGODB_URI must be set"))?;
    let database = env::var("MONGODB_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_string());
    let client = create_mongo_client(&mongo_uri).await.map_err(io::Error::other)?;

    let config = GenerationConfig::from_env();
    info!(
        "Itinerary models: primary={} fallback={:?} retry_delay={:?}",
        config.primary_model, config.fallback_model, config.retry_delay
    );
    let provider = GeminiClient::from_env().map_err(io::Error::other)?;
    let generator = web::Data::new(ItineraryGenerator::with_config(provider, config));
    let trips = web::Data::new(TripService::new(&client, &database));
    let auth = AuthMiddleware::from_env();

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::default().allow_any_origin().allow_any_method().allow_any_header())
            .wrap(Logger::default())
            .app_data(web::Data::new(client.clone()))
            .app_data(generator.clone())
            .app_data(trips.clone())
            .route("/health", web::get().to(routes::health::health_check))
            .service(
                web::scope("/api")
                    .configure(routes::itinerary::configure::<GeminiClient>)
                    .service(
                        web::scope("/trips")
                            .wrap(auth.clone())
                            .configure(routes::trip::configure),
                    ),
            )
    })
    .bind((host, port))?
    .run()
    .await
}
