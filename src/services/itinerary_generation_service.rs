use crate::models::itinerary::{DayPlan, GenerationRequest, Itinerary, ValidatedRequest};
use crate::services::cancellation::CancellationToken;
use crate::services::generation_events::{
    AttemptOutcome, GenerationAttempt, GenerationEvent, GenerationObserver, LogObserver,
};
use crate::services::text_generation::{ProviderError, TextGenerator};
use log::warn;
use std::{env, sync::Arc, time::Duration};
use thiserror::Error;
use uuid::Uuid;

const PRIMARY_MODEL: &str = "gemini-2.5-flash";
const FALLBACK_MODEL: &str = "gemini-1.5-flash";
const ATTEMPTS_PER_MODEL: u32 = 3;
const RETRY_DELAY_MS: u64 = 2000;

const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub primary_model: String,
    /// Used for one more attempt cycle once the primary model stays overloaded.
    pub fallback_model: Option<String>,
    pub attempts_per_model: u32,
    pub retry_delay: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            primary_model: PRIMARY_MODEL.to_string(),
            fallback_model: Some(FALLBACK_MODEL.to_string()),
            attempts_per_model: ATTEMPTS_PER_MODEL,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

impl GenerationConfig {
    /// Defaults overridden by `GEMINI_PRIMARY_MODEL`, `GEMINI_FALLBACK_MODEL`
    /// and `GENERATION_RETRY_DELAY_MS`. An empty fallback disables it.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(model) = env::var("GEMINI_PRIMARY_MODEL") {
            if !model.trim().is_empty() {
                config.primary_model = model.trim().to_string();
            }
        }

        if let Ok(model) = env::var("GEMINI_FALLBACK_MODEL") {
            let model = model.trim();
            config.fallback_model = if model.is_empty() {
                None
            } else {
                Some(model.to_string())
            };
        }

        if let Ok(delay) = env::var("GENERATION_RETRY_DELAY_MS") {
            match delay.trim().parse::<u64>() {
                Ok(ms) => config.retry_delay = Duration::from_millis(ms),
                Err(_) => warn!(
                    "Ignoring invalid GENERATION_RETRY_DELAY_MS={:?}, using {}ms",
                    delay, RETRY_DELAY_MS
                ),
            }
        }

        config
    }

    /// Models in the order they are tried: primary, then fallback if distinct.
    fn model_sequence(&self) -> Vec<&str> {
        let mut models = vec![self.primary_model.as_str()];
        if let Some(fallback) = self.fallback_model.as_deref() {
            if fallback != self.primary_model {
                models.push(fallback);
            }
        }
        models
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid request: {0}")]
    Caller(String),

    #[error("itinerary generation unavailable after {attempts} attempt(s), last model {model}: {reason}")]
    ProviderUnavailable {
        model: String,
        attempts: u32,
        reason: String,
    },

    #[error("provider returned a malformed itinerary: {reason}")]
    MalformedResponse { reason: String, raw: String },

    #[error("itinerary generation was cancelled")]
    Cancelled,

    #[error("itinerary generation is not configured: {0}")]
    Configuration(String),
}

impl GenerationError {
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::Caller(_) => "CALLER_ERROR",
            GenerationError::ProviderUnavailable { .. } => "PROVIDER_UNAVAILABLE",
            GenerationError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            GenerationError::Cancelled => "CANCELLED",
            GenerationError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Whether the same request may succeed if the caller tries again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::ProviderUnavailable { .. })
    }
}

/// Renders the instruction sent to the provider. Pure: equal requests give
/// equal prompts.
pub fn build_prompt(request: &ValidatedRequest) -> String {
    let destination = request.destination.as_deref().unwrap_or("a generic city");
    let interests = if request.interests.is_empty() {
        "General".to_string()
    } else {
        request.interests.join(", ")
    };

    format!(
        r#"Create a {days}-day travel itinerary for {destination} with a {budget} budget.
Interests: {interests}.

The output must be a valid JSON array with exactly one object per day, in order.
Each day object must contain exactly three activities, labeled Morning, Afternoon and Evening.
Format:
[
    {{
        "day": 1,
        "activities": [
            {{ "time": "Morning", "activity": "Activity Name", "type": "Type (e.g. Cultural)", "cost": "Cost (Low/Medium/High/Free)" }},
            {{ "time": "Afternoon", "activity": "Activity Name", "type": "Type", "cost": "Cost" }},
            {{ "time": "Evening", "activity": "Activity Name", "type": "Type", "cost": "Cost" }}
        ]
    }}
]

Provide ONLY the JSON array. No markdown code blocks, no explanation."#,
        days = request.days,
        destination = destination,
        budget = request.budget,
        interests = interests,
    )
}

/// Strips a surrounding code fence (with optional language tag) and
/// whitespace. Text without fences is only trimmed.
pub fn sanitize_response(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix(FENCE) {
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+')))
            .unwrap_or(rest.len());
        text = &rest[tag_len..];
    }

    if let Some(rest) = text.trim_end().strip_suffix(FENCE) {
        text = rest;
    }

    text.trim()
}

/// Parses sanitized provider text into an itinerary of `expected_days` days
/// numbered 1..=N, each with at least one activity.
pub fn parse_itinerary(text: &str, expected_days: u32) -> Result<Itinerary, String> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    let days: Vec<DayPlan> = serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
        let path = err.path().to_string();
        format!("{} (at {})", err.into_inner(), path)
    })?;
    deserializer.end().map_err(|err| err.to_string())?;

    if days.is_empty() {
        return Err("itinerary contains no days".to_string());
    }

    if days.len() != expected_days as usize {
        return Err(format!(
            "expected {} day(s), got {}",
            expected_days,
            days.len()
        ));
    }

    for (index, plan) in days.iter().enumerate() {
        let expected = index as u32 + 1;
        if plan.day != expected {
            return Err(format!(
                "day at position {} is numbered {}, expected {}",
                index, plan.day, expected
            ));
        }
        if plan.activities.is_empty() {
            return Err(format!("day {} has no activities", plan.day));
        }
    }

    Ok(Itinerary { days })
}

/// Turns a [`GenerationRequest`] into an [`Itinerary`] using a text provider.
pub struct ItineraryGenerator<P> {
    provider: P,
    config: GenerationConfig,
    observer: Arc<dyn GenerationObserver>,
}

impl<P: TextGenerator> ItineraryGenerator<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, GenerationConfig::default())
    }

    pub fn with_config(provider: P, config: GenerationConfig) -> Self {
        Self {
            provider,
            config,
            observer: Arc::new(LogObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn GenerationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generates an itinerary under a fresh request id.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Itinerary, GenerationError> {
        let request_id = Uuid::new_v4().to_string();
        self.generate_with_id(&request_id, request, cancel).await
    }

    pub async fn generate_with_id(
        &self,
        request_id: &str,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Itinerary, GenerationError> {
        let result = self.run(request_id, request, cancel).await;

        let event = match &result {
            Ok(itinerary) => GenerationEvent::Completed {
                days: itinerary.len(),
            },
            Err(GenerationError::Caller(reason)) => GenerationEvent::Rejected {
                reason: reason.clone(),
            },
            Err(GenerationError::Cancelled) => GenerationEvent::Cancelled,
            Err(err) => GenerationEvent::Failed {
                code: err.code(),
                reason: err.to_string(),
            },
        };
        self.observer.on_event(request_id, &event);

        result
    }

    async fn run(
        &self,
        request_id: &str,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Itinerary, GenerationError> {
        let validated = request.validate().map_err(GenerationError::Caller)?;

        self.observer.on_event(
            request_id,
            &GenerationEvent::Started {
                destination: validated.destination.clone(),
                days: validated.days,
                budget: validated.budget.to_string(),
            },
        );

        let prompt = build_prompt(&validated);
        let raw = self.invoke(request_id, &prompt, cancel).await?;

        parse_itinerary(sanitize_response(&raw), validated.days).map_err(|reason| {
            GenerationError::MalformedResponse {
                reason,
                raw: raw.clone(),
            }
        })
    }

    /// Calls the provider, retrying overloaded models. At most
    /// `attempts_per_model` calls are made per model in the sequence.
    async fn invoke(
        &self,
        request_id: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        let attempts_per_model = self.config.attempts_per_model.max(1);
        let models = self.config.model_sequence();
        let mut total_attempts = 0;
        let mut last_reason = String::new();

        for (tier, model) in models.iter().enumerate() {
            if tier > 0 {
                self.observer.on_event(
                    request_id,
                    &GenerationEvent::FallbackEngaged {
                        from: models[tier - 1].to_string(),
                        to: model.to_string(),
                    },
                );
            }

            for attempt in 0..attempts_per_model {
                if cancel.is_cancelled() {
                    return Err(GenerationError::Cancelled);
                }
                total_attempts += 1;

                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                    result = self.provider.generate_text(model, prompt) => result,
                };

                let outcome = match &result {
                    Ok(text) => AttemptOutcome::Success {
                        text_len: text.len(),
                    },
                    Err(err) if err.is_overloaded() => AttemptOutcome::Retryable {
                        reason: err.to_string(),
                    },
                    Err(err) => AttemptOutcome::Fatal {
                        reason: err.to_string(),
                    },
                };
                self.observer.on_event(
                    request_id,
                    &GenerationEvent::Attempted(GenerationAttempt {
                        model: model.to_string(),
                        attempt,
                        outcome,
                    }),
                );

                match result {
                    Ok(text) => return Ok(text),
                    Err(err) if err.is_overloaded() => {
                        last_reason = err.to_string();
                        if attempt + 1 < attempts_per_model && !self.pause(cancel).await {
                            return Err(GenerationError::Cancelled);
                        }
                    }
                    Err(ProviderError::Configuration(reason)) => {
                        return Err(GenerationError::Configuration(reason))
                    }
                    Err(err) => {
                        return Err(GenerationError::ProviderUnavailable {
                            model: model.to_string(),
                            attempts: total_attempts,
                            reason: err.to_string(),
                        })
                    }
                }
            }
        }

        Err(GenerationError::ProviderUnavailable {
            model: models.last().copied().unwrap_or_default().to_string(),
            attempts: total_attempts,
            reason: last_reason,
        })
    }

    /// Waits out the retry delay. Returns false if cancelled first.
    async fn pause(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.config.retry_delay) => true,
        }
    }
}
