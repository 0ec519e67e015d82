//! Google Gemini `generateContent` adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http_client::{build_provider_http_client, execute_json};
use super::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, Provider, ProviderError, ProviderId};

const PROVIDER: &str = "gemini";

/// Default Generative Language API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro-latest";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Adapter for the Gemini `generateContent` endpoint.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    /// Creates an adapter against the public Generative Language API.
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
            model: DEFAULT_GEMINI_MODEL.to_string(),
        })
    }

    /// Overrides the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(PROVIDER)
    }

    #[tracing::instrument(skip(self, prompt), fields(provider = PROVIDER, model = %self.model))]
    async fn send(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(&self.model)
        );
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: DEFAULT_TEMPERATURE,
                max_output_tokens: DEFAULT_MAX_TOKENS,
            },
        };

        // The key goes in the query string; keep it out of the log line.
        debug!(api_url = %url, prompt_len = prompt.len(), "Calling Gemini generateContent");
        let request = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body);
        let response: GenerateResponse = execute_json(PROVIDER, request, timeout).await?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect::<String>())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                ProviderError::malformed(PROVIDER, "response has no candidates[0].content.parts text")
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_request_uses_camel_case_config() {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: "hi" }],
            }],
            generation_config: GenerationConfig {
                temperature: DEFAULT_TEMPERATURE,
                max_output_tokens: DEFAULT_MAX_TOKENS,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 4000);
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }

    #[test]
    fn test_gemini_debug_hides_api_key() {
        let provider = GeminiProvider::new("g-secret").unwrap();
        assert!(!format!("{provider:?}").contains("g-secret"));
    }
}
