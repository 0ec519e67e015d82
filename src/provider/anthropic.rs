//! Anthropic messages API adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http_client::{build_provider_http_client, execute_json};
use super::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, Provider, ProviderError, ProviderId};

const PROVIDER: &str = "anthropic";

/// Default Anthropic API base URL.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value the request body is written against.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default messages model.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    text: Option<String>,
}

impl MessagesResponse {
    /// First text block; tool-use and thinking blocks carry no answer text.
    fn into_text(self) -> Option<String> {
        self.content
            .into_iter()
            .filter(|block| block.kind.is_empty() || block.kind == "text")
            .find_map(|block| block.text)
    }
}

/// Adapter for the Anthropic messages endpoint.
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    /// Creates an adapter against the public Anthropic API.
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
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
        })
    }

    /// Overrides the messages model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(PROVIDER)
    }

    #[tracing::instrument(skip(self, prompt), fields(provider = PROVIDER, model = %self.model))]
    async fn send(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(api_url = %url, prompt_len = prompt.len(), "Calling Anthropic messages API");
        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        let response: MessagesResponse = execute_json(PROVIDER, request, timeout).await?;

        response
            .into_text()
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "response has no text content block"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_anthropic_debug_hides_api_key() {
        let provider = AnthropicProvider::new("sk-ant-secret").unwrap();
        assert!(!format!("{provider:?}").contains("sk-ant-secret"));
    }

    #[test]
    fn test_anthropic_response_picks_first_text_block() {
        let raw = r#"{"content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"answer"}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.into_text().as_deref(), Some("answer"));
    }

    #[test]
    fn test_anthropic_model_override() {
        let provider = AnthropicProvider::new("k").unwrap().model("claude-sonnet-4");
        assert_eq!(provider.model, "claude-sonnet-4");
    }
}
