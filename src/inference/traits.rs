//! Inference client trait and boundary error types.

use async_trait::async_trait;
use thiserror::Error;

use crate::session::transcript::Turn;

/// Failure modes of one generation call. The core never retries these; a
/// retry policy, if any, belongs to the caller wrapping the client.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference call timed out")]
    Timeout,

    #[error("inference transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("malformed inference response: {0}")]
    MalformedResponse(String),
}

/// Generation parameters passed through to the model backend.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: Option<u32>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_output_tokens: None,
        }
    }
}

/// Stateless request/response wrapper around the external model.
///
/// Accepts an ordered transcript and returns the generated assistant text.
/// Implementations hold no conversation state of their own.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Generate one assistant reply from the given context.
    async fn generate(
        &self,
        context: &[Turn],
        options: &GenerateOptions,
    ) -> Result<String, InferenceError>;

    /// The name of this client implementation.
    fn name(&self) -> &str;
}
