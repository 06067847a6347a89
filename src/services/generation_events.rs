//! Structured events emitted while generating an itinerary.
//!
//! Every event is delivered together with the request id of the invocation
//! that produced it. Production wiring uses [`LogObserver`]; tests inject a
//! [`RecordingObserver`] and inspect what was emitted.

use log::{error, info, warn};
use std::sync::Mutex;

/// Result of a single provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { text_len: usize },
    Retryable { reason: String },
    Fatal { reason: String },
}

impl AttemptOutcome {
    fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Success { .. } => "success",
            AttemptOutcome::Retryable { .. } => "retryable",
            AttemptOutcome::Fatal { .. } => "fatal",
        }
    }
}

/// One provider call. Lives only as long as the invocation that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationAttempt {
    pub model: String,
    /// 0-based attempt number against `model`.
    pub attempt: u32,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    Started {
        destination: Option<String>,
        days: u32,
        budget: String,
    },
    Rejected {
        reason: String,
    },
    Attempted(GenerationAttempt),
    FallbackEngaged {
        from: String,
        to: String,
    },
    Cancelled,
    Completed {
        days: usize,
    },
    Failed {
        code: &'static str,
        reason: String,
    },
}

pub trait GenerationObserver: Send + Sync {
    fn on_event(&self, request_id: &str, event: &GenerationEvent);
}

/// Writes each event as a single `key=value` log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl GenerationObserver for LogObserver {
    fn on_event(&self, request_id: &str, event: &GenerationEvent) {
        match event {
            GenerationEvent::Started {
                destination,
                days,
                budget,
            } => info!(
                "request_id={} event=started destination={:?} days={} budget={}",
                request_id,
                destination.as_deref().unwrap_or("generic"),
                days,
                budget
            ),
            GenerationEvent::Rejected { reason } => {
                warn!("request_id={} event=rejected reason={:?}", request_id, reason)
            }
            GenerationEvent::Attempted(attempt) => {
                let detail = match &attempt.outcome {
                    AttemptOutcome::Success { text_len } => format!("text_len={}", text_len),
                    AttemptOutcome::Retryable { reason } | AttemptOutcome::Fatal { reason } => {
                        format!("reason={:?}", reason)
                    }
                };
                let line = format!(
                    "request_id={} event=attempt model={} attempt={} outcome={} {}",
                    request_id,
                    attempt.model,
                    attempt.attempt + 1,
                    attempt.outcome.label(),
                    detail
                );
                match attempt.outcome {
                    AttemptOutcome::Success { .. } => info!("{}", line),
                    _ => warn!("{}", line),
                }
            }
            GenerationEvent::FallbackEngaged { from, to } => warn!(
                "request_id={} event=fallback from={} to={}",
                request_id, from, to
            ),
            GenerationEvent::Cancelled => info!("request_id={} event=cancelled", request_id),
            GenerationEvent::Completed { days } => {
                info!("request_id={} event=completed days={}", request_id, days)
            }
            GenerationEvent::Failed { code, reason } => error!(
                "request_id={} event=failed code={} reason={:?}",
                request_id, code, reason
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(String, GenerationEvent)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, GenerationEvent)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn attempts(&self) -> Vec<GenerationAttempt> {
        self.events()
            .into_iter()
            .filter_map(|(_, event)| match event {
                GenerationEvent::Attempted(attempt) => Some(attempt),
                _ => None,
            })
            .collect()
    }
}

impl GenerationObserver for RecordingObserver {
    fn on_event(&self, request_id: &str, event: &GenerationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push((request_id.to_string(), event.clone()));
        }
    }
}
