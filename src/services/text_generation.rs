use thiserror::Error;

/// Failure reported by a text-generation provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The model is temporarily over capacity (HTTP 503). Worth retrying.
    #[error("model {model} is overloaded: {message}")]
    Overloaded { model: String, message: String },

    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request to provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned no text")]
    EmptyResponse,

    #[error("provider is not configured: {0}")]
    Configuration(String),
}

impl ProviderError {
    pub fn is_overloaded(&self) -> bool {
        matches!(self, ProviderError::Overloaded { .. })
    }
}

/// Outbound interface to a generative-text service.
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, ProviderError>;
}
