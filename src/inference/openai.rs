//! OpenAI-compatible inference client.
//!
//! Most hosted model APIs speak the same `/v1/chat/completions` format, so a
//! single implementation covers OpenAI itself plus the compatible gateways.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::sanitize_api_error;
use super::traits::{GenerateOptions, InferenceClient, InferenceError};
use crate::session::transcript::Turn;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiCompatibleClient {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiCompatibleClient {
    pub fn new(name: &str, base_url: &str, api_key: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(ToString::to_string),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    pub fn with_base_url(base_url: Option<&str>, api_key: Option<&str>) -> Self {
        Self::new("openai", base_url.unwrap_or(DEFAULT_BASE_URL), api_key)
    }

    /// Full chat-completions URL, accepting base URLs that already carry the
    /// endpoint path (some gateways are configured that way).
    fn chat_completions_url(&self) -> String {
        if self
            .base_url
            .trim_end_matches('/')
            .ends_with("/chat/completions")
        {
            self.base_url.clone()
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the assistant text out of a parsed response body.
fn extract_text(response: ChatResponse) -> Result<String, InferenceError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| InferenceError::MalformedResponse("response carried no choices".into()))?;

    match choice.message.content {
        Some(content) if !content.is_empty() => Ok(content),
        _ => Err(InferenceError::MalformedResponse(
            "first choice carried no content".into(),
        )),
    }
}

#[async_trait]
impl InferenceClient for OpenAiCompatibleClient {
    async fn generate(
        &self,
        context: &[Turn],
        options: &GenerateOptions,
    ) -> Result<String, InferenceError> {
        let request = ChatRequest {
            model: &options.model,
            messages: context
                .iter()
                .map(|turn| WireMessage {
                    role: turn.role.to_string(),
                    content: turn.content.clone(),
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_output_tokens,
        };

        let mut builder = self.client.post(self.chat_completions_url()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout
            } else {
                InferenceError::Transport(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            return Err(InferenceError::Api {
                provider: self.name.clone(),
                status: status.as_u16(),
                message: sanitize_api_error(&body),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;
        extract_text(parsed)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
