use crate::db::mongo;
use actix_web::{web, HttpResponse, Responder};
use log::error;
use mongodb::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub services: BTreeMap<String, ServiceStatus>,
    pub environment: String,
    pub version: String,
}

#[derive(Serialize, Clone)]
pub struct ServiceStatus {
    pub status: String,
    pub details: Option<String>,
}

impl ServiceStatus {
    fn ok(details: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            details: Some(details.into()),
        }
    }

    fn error(details: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            details: Some(details.into()),
        }
    }
}

/// `ok` when every service reports ok, otherwise `degraded`.
pub fn overall_status(services: &BTreeMap<String, ServiceStatus>) -> &'static str {
    if services.values().all(|s| s.status == "ok") {
        "ok"
    } else {
        "degraded"
    }
}

pub async fn health_check(client: web::Data<Arc<Client>>) -> impl Responder {
    let mut services = BTreeMap::new();
    services.insert("mongodb".to_string(), check_mongodb(&client).await);
    services.insert("gemini".to_string(), check_gemini());

    let health = HealthStatus {
        status: overall_status(&services).to_string(),
        services,
        environment: env::var("RUST_ENV").unwrap_or("development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    HttpResponse::Ok().json(health)
}

async fn check_mongodb(client: &Client) -> ServiceStatus {
    match mongo::ping(client).await {
        Ok(()) => ServiceStatus::ok("Connected successfully to MongoDB"),
        Err(e) => {
            error!("MongoDB health check failed: {}", e);
            ServiceStatus::error(format!("Failed to connect: {}", e))
        }
    }
}

fn check_gemini() -> ServiceStatus {
    match env::var("GEMINI_API_KEY") {
        Ok(key) if !key.is_empty() => {
            ServiceStatus::ok(format!("Gemini API key configured ({})", mask_key(&key)))
        }
        _ => ServiceStatus::error("GEMINI_API_KEY not configured"),
    }
}

/// First and last four characters of keys longer than eight characters.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    } else {
        "***".to_string()
    }
}
