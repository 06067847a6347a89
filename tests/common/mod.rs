#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use jsonwebtoken::{encode, EncodingKey, Header};
use trip_planner_api::middleware::auth::Claims;
use trip_planner_api::services::{
    generation_events::RecordingObserver,
    itinerary_generation_service::{GenerationConfig, ItineraryGenerator},
    text_generation::{ProviderError, TextGenerator},
};

pub const PRIMARY: &str = "gemini-2.5-flash";
pub const FALLBACK: &str = "gemini-1.5-flash";
pub const TEST_SECRET: &str = "test-secret";

type Responder = dyn Fn(&str, usize) -> Result<String, ProviderError> + Send + Sync;

/// Provider stub that answers from a closure of `(model, call_index)` and
/// records every model it was called with.
pub struct ScriptedProvider {
    respond: Box<Responder>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(
        respond: impl Fn(&str, usize) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _| Ok(text.clone()))
    }

    pub fn always_overloaded() -> Self {
        Self::new(|model, _| Err(overloaded(model)))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, model: &str) -> usize {
        self.calls().iter().filter(|m| m.as_str() == model).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl TextGenerator for ScriptedProvider {
    async fn generate_text(&self, model: &str, _prompt: &str) -> Result<String, ProviderError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(model.to_string());
            calls.len() - 1
        };
        (self.respond)(model, index)
    }
}

pub fn overloaded(model: &str) -> ProviderError {
    ProviderError::Overloaded {
        model: model.to_string(),
        message: "The model is overloaded. Please try again later.".to_string(),
    }
}

pub fn fast_config() -> GenerationConfig {
    GenerationConfig {
        retry_delay: Duration::ZERO,
        ..GenerationConfig::default()
    }
}

pub fn generator_with(
    provider: ScriptedProvider,
    config: GenerationConfig,
) -> (ItineraryGenerator<ScriptedProvider>, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::new());
    let generator = ItineraryGenerator::with_config(provider, config).with_observer(observer.clone());
    (generator, observer)
}

pub fn kyoto_itinerary_json() -> String {
    serde_json::json!([
        {
            "day": 1,
            "activities": [
                { "time": "Morning", "activity": "Fushimi Inari Taisha", "type": "Cultural", "cost": "Free" },
                { "time": "Afternoon", "activity": "Nishiki Market tasting", "type": "Food", "cost": "Low" },
                { "time": "Evening", "activity": "Gion lantern walk", "type": "Cultural", "cost": "Free" }
            ]
        },
        {
            "day": 2,
            "activities": [
                { "time": "Morning", "activity": "Arashiyama Bamboo Grove", "type": "Nature", "cost": "Free" },
                { "time": "Afternoon", "activity": "Tenryu-ji Temple", "type": "Cultural", "cost": "Low" },
                { "time": "Evening", "activity": "Kaiseki dinner in Pontocho", "type": "Food", "cost": "High" }
            ]
        }
    ])
    .to_string()
}

pub fn bearer_token(user_id: &str) -> String {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: "test@example.com".to_string(),
        exp: now + 3600,
        iat: now,
        user_id: user_id.to_string(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}
