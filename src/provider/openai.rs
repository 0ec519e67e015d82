//! `OpenAI` chat completions adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http_client::{build_provider_http_client, execute_json};
use super::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, Provider, ProviderError, ProviderId};

const PROVIDER: &str = "openai";

/// Default `OpenAI` API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default chat model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Adapter for the `OpenAI` chat completions endpoint.
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    /// Creates an adapter against the public `OpenAI` API.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if HTTP client construction fails.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::build(api_key.into(), DEFAULT_BASE_URL.to_string())
    }

    /// Creates an adapter with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if HTTP client construction fails.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Self::build(api_key.into(), base_url.into())
    }

    fn build(api_key: String, base_url: String) -> Result<Self, ProviderError> {
        let client = build_provider_http_client(PROVIDER)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: DEFAULT_OPENAI_MODEL.to_string(),
        })
    }

    /// Overrides the chat model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(PROVIDER)
    }

    #[tracing::instrument(skip(self, prompt), fields(provider = PROVIDER, model = %self.model))]
    async fn send(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        };

        debug!(api_url = %url, prompt_len = prompt.len(), "Calling OpenAI chat completions");
        let request = self.client.post(&url).bearer_auth(&self.api_key).json(&body);
        let response: ChatResponse = execute_json(PROVIDER, request, timeout).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "response has no choices[0].message.content"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_debug_hides_api_key() {
        let provider = OpenAiProvider::new("sk-secret").unwrap();
        let debug = format!("{provider:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains(DEFAULT_OPENAI_MODEL));
    }

    #[test]
    fn test_openai_request_body_shape() {
        let body = ChatRequest {
            model: "gpt-4o",
            messages: [ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 4000);
    }

    #[test]
    fn test_openai_base_url_trailing_slash_trimmed() {
        let provider = OpenAiProvider::with_base_url("k", "http://localhost:1234/").unwrap();
        assert_eq!(provider.base_url, "http://localhost:1234");
    }
}
