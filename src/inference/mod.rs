//! Inference client subsystem.
//!
//! Each backend implements the [`InferenceClient`] trait defined in [`traits`]
//! and is registered in the factory function [`create_client`] by its
//! canonical string key. The core performs no retries; wrap the client if a
//! retry policy is wanted.

pub mod openai;
pub mod traits;

pub use openai::OpenAiCompatibleClient;
pub use traits::{GenerateOptions, InferenceClient, InferenceError};

use std::sync::Arc;

const MAX_API_ERROR_CHARS: usize = 200;

const SECRET_PREFIXES: [&str; 7] = [
    "sk-",
    "xoxb-",
    "xoxp-",
    "ghp_",
    "gho_",
    "ghu_",
    "github_pat_",
];

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn looks_like_secret(token: &str) -> bool {
    SECRET_PREFIXES.iter().any(|prefix| {
        token
            .find(prefix)
            .is_some_and(|pos| token.len() > pos + prefix.len())
    })
}

/// Scrub known secret-like token prefixes from provider error strings.
pub fn scrub_secret_patterns(input: &str) -> String {
    let mut scrubbed = String::with_capacity(input.len());
    let mut token = String::new();

    for c in input.chars() {
        if is_token_char(c) {
            token.push(c);
            continue;
        }
        if looks_like_secret(&token) {
            scrubbed.push_str("[REDACTED]");
        } else {
            scrubbed.push_str(&token);
        }
        token.clear();
        scrubbed.push(c);
    }
    if looks_like_secret(&token) {
        scrubbed.push_str("[REDACTED]");
    } else {
        scrubbed.push_str(&token);
    }

    scrubbed
}

/// Sanitize API error text by scrubbing secrets and truncating length.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let truncated: String = scrubbed.chars().take(MAX_API_ERROR_CHARS).collect();
    format!("{truncated}...")
}

/// Resolve the API key for a client from an explicit value or the environment.
fn resolve_credential(name: &str, credential_override: Option<&str>) -> Option<String> {
    if let Some(raw) = credential_override {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_owned());
        }
    }

    let provider_env: &[&str] = match name {
        "openai" => &["OPENAI_API_KEY"],
        _ => &[],
    };

    for env_var in provider_env.iter().chain(["PARLEY_API_KEY", "API_KEY"].iter()) {
        if let Ok(value) = std::env::var(env_var) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Factory: create the right inference client from config.
pub fn create_client(
    name: &str,
    api_key: Option<&str>,
    api_url: Option<&str>,
) -> anyhow::Result<Arc<dyn InferenceClient>> {
    let credential = resolve_credential(name, api_key);
    match name {
        "openai" => Ok(Arc::new(OpenAiCompatibleClient::with_base_url(
            api_url,
            credential.as_deref(),
        ))),
        _ => anyhow::bail!("Unknown inference client: {name}. Only \"openai\" is currently supported."),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Mock inference clients shared by the session tests.

    use super::traits::{GenerateOptions, InferenceClient, InferenceError};
    use crate::session::transcript::{Role, Turn};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Replies with `echo#<context len>: <last user content>`, optionally
    /// sleeping first to keep the writer slot busy.
    pub struct EchoClient {
        pub delay: Option<Duration>,
    }

    impl EchoClient {
        pub fn new() -> Self {
            Self { delay: None }
        }

        pub fn with_delay(delay: Duration) -> Self {
            Self { delay: Some(delay) }
        }
    }

    #[async_trait]
    impl InferenceClient for EchoClient {
        async fn generate(
            &self,
            context: &[Turn],
            _options: &GenerateOptions,
        ) -> Result<String, InferenceError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let last_user = context
                .iter()
                .rev()
                .find(|turn| turn.role == Role::User)
                .map(|turn| turn.content.as_str())
                .unwrap_or("<no user turn>");
            Ok(format!("echo#{}: {last_user}", context.len()))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    /// Always fails with a provider-side rejection.
    pub struct FailingClient;

    #[async_trait]
    impl InferenceClient for FailingClient {
        async fn generate(
            &self,
            _context: &[Turn],
            _options: &GenerateOptions,
        ) -> Result<String, InferenceError> {
            Err(InferenceError::Api {
                provider: "mock".to_string(),
                status: 500,
                message: "provider exploded".to_string(),
            })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_openai() {
        assert!(create_client("openai", Some("client-test-credential"), None).is_ok());
    }

    #[test]
    fn factory_unknown_client_errors() {
        let result = create_client("nonexistent", None, None);
        assert!(result.is_err());
        let msg = result.err().unwrap().to_string();
        assert!(msg.contains("Unknown inference client"));
    }

    // ── API error sanitization ───────────────────────────────

    #[test]
    fn sanitize_scrubs_sk_prefix() {
        let input = "request failed: sk-1234567890abcdef";
        let out = sanitize_api_error(input);
        assert!(!out.contains("sk-1234567890abcdef"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn sanitize_scrubs_multiple_prefixes() {
        let input = "keys sk-abcdef xoxb-12345 ghp_zzz999";
        let out = sanitize_api_error(input);
        assert!(!out.contains("sk-abcdef"));
        assert!(!out.contains("xoxb-12345"));
        assert!(!out.contains("ghp_zzz999"));
    }

    #[test]
    fn sanitize_truncates_long_error() {
        let long = "a".repeat(400);
        let result = sanitize_api_error(&long);
        assert!(result.len() <= 203);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn sanitize_no_secret_no_change() {
        let input = "simple upstream timeout";
        assert_eq!(sanitize_api_error(input), input);
    }

    #[test]
    fn bare_prefix_without_payload_is_kept() {
        assert_eq!(scrub_secret_patterns("sk- alone"), "sk- alone");
    }

    #[test]
    fn resolve_credential_prefers_explicit_argument() {
        let resolved = resolve_credential("openai", Some("  explicit-key  "));
        assert_eq!(resolved, Some("explicit-key".to_string()));
    }
}
