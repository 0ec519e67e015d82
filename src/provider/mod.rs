//! LLM provider gateway.
//!
//! The engine sees every provider through one capability: send a prompt, get
//! free text back or a [`ProviderError`]. Calls are stateless and never retried
//! here; the orchestrator owns timeouts and failure recording.
//!
//! # Architecture
//!
//! - [`Provider`] - Async trait implemented by every adapter and test double
//! - [`ProviderId`] - Opaque, ordered provider identifier
//! - [`OpenAiProvider`] - Chat completions adapter
//! - [`AnthropicProvider`] - Messages API adapter
//! - [`GeminiProvider`] - `generateContent` adapter
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::provider::build_default_providers;
//!
//! let providers = build_default_providers(|name| std::env::var(name).ok());
//! for provider in &providers {
//!     println!("configured: {}", provider.id());
//! }
//! ```

mod anthropic;
mod error;
mod gemini;
pub(crate) mod http_client;
mod openai;

pub use anthropic::AnthropicProvider;
pub use error::ProviderError;
pub use gemini::GeminiProvider;
pub use http_client::parse_retry_after;
pub use openai::OpenAiProvider;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

/// Sampling temperature sent to every provider.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Completion length cap sent to every provider.
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Identifier of one LLM provider (`openai`, `anthropic`, `gemini`, or custom).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Creates an identifier, trimming and lower-casing the name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_ascii_lowercase())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// Provider families with a built-in adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderFamily {
    /// `OpenAI` chat completions.
    OpenAi,
    /// Anthropic messages.
    Anthropic,
    /// Google Gemini.
    Gemini,
}

impl ProviderFamily {
    /// All families in their default fan-out order.
    pub const ALL: [Self; 3] = [Self::OpenAi, Self::Anthropic, Self::Gemini];

    /// Canonical identifier for adapters of this family.
    #[must_use]
    pub fn id(self) -> ProviderId {
        ProviderId::new(self.name())
    }

    /// Lower-case family name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }

    /// Environment variables holding the API key, in lookup order.
    #[must_use]
    pub fn api_key_vars(self) -> &'static [&'static str] {
        match self {
            Self::OpenAi => &["OPENAI_API_KEY"],
            Self::Anthropic => &["ANTHROPIC_API_KEY"],
            Self::Gemini => &["GEMINI_API_KEY", "GOOGLE_GEMINI_API_KEY"],
        }
    }

    /// Environment variable overriding the default model.
    #[must_use]
    pub fn model_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_MODEL",
            Self::Anthropic => "ANTHROPIC_MODEL",
            Self::Gemini => "GEMINI_MODEL",
        }
    }
}

impl FromStr for ProviderFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "gpt" | "chatgpt" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(format!(
                "unknown provider '{other}' (expected openai, anthropic or gemini)"
            )),
        }
    }
}

/// Capability every LLM provider adapter implements.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Identifier used in results, failure records and logs.
    fn id(&self) -> ProviderId;

    /// Sends one stateless prompt and returns the raw answer text.
    ///
    /// `timeout` bounds the whole call. Implementations must not retry.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] for authentication, throttling, transport,
    /// timeout, or body decoding failures.
    async fn send(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError>;
}

/// Builds adapters for every family whose API key is available through `lookup`.
///
/// `lookup` is normally `|name| std::env::var(name).ok()`. Families without a
/// key are skipped with a debug log; adapters that fail to build are skipped
/// with a warning so the remaining providers still run.
#[must_use]
pub fn build_default_providers<F>(lookup: F) -> Vec<Arc<dyn Provider>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut providers: Vec<Arc<dyn Provider>> = Vec::new();

    for family in ProviderFamily::ALL {
        let Some(api_key) = family
            .api_key_vars()
            .iter()
            .find_map(|var| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
        else {
            debug!(provider = family.name(), "No API key configured; provider skipped");
            continue;
        };
        let model = lookup(family.model_var())
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let built: Result<Arc<dyn Provider>, ProviderError> = match family {
            ProviderFamily::OpenAi => OpenAiProvider::new(api_key).map(|p| {
                Arc::new(match model {
                    Some(model) => p.model(model),
                    None => p,
                }) as Arc<dyn Provider>
            }),
            ProviderFamily::Anthropic => AnthropicProvider::new(api_key).map(|p| {
                Arc::new(match model {
                    Some(model) => p.model(model),
                    None => p,
                }) as Arc<dyn Provider>
            }),
            ProviderFamily::Gemini => GeminiProvider::new(api_key).map(|p| {
                Arc::new(match model {
                    Some(model) => p.model(model),
                    None => p,
                }) as Arc<dyn Provider>
            }),
        };

        match built {
            Ok(provider) => providers.push(provider),
            Err(error) => warn!(
                provider = family.name(),
                error = %error,
                "Provider adapter unavailable; continuing with remaining providers"
            ),
        }
    }

    providers
}
