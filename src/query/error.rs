//! Error types for run configuration.
//!
//! Configuration errors are the only failures an extraction run surfaces to
//! its caller. They are raised before any provider is contacted, following the
//! What/Why/Fix pattern used across the project.

use thiserror::Error;

/// Fatal configuration problems detected at run start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The research question is empty or whitespace only.
    #[error(
        "research question is empty\n  Suggestion: Pass a question such as \"Which online banks have the lowest fees?\""
    )]
    EmptyQuestion,

    /// No provider is enabled for the run.
    #[error("no providers enabled\n  Suggestion: {suggestion}")]
    NoProvidersEnabled {
        /// How to enable a provider
        suggestion: String,
    },

    /// A provider is enabled but no adapter was registered for it.
    #[error("provider '{provider}' is enabled but not configured\n  Suggestion: {suggestion}")]
    ProviderNotRegistered {
        /// The enabled provider identifier
        provider: String,
        /// How to register the provider
        suggestion: String,
    },

    /// A numeric or enumerated setting is out of range.
    #[error("invalid value for `{field}`: {value}. Expected: {expected}")]
    InvalidSetting {
        /// Setting name
        field: &'static str,
        /// Offending value, rendered for display
        value: String,
        /// Accepted range or values
        expected: &'static str,
    },
}

impl ConfigError {
    /// Creates a `NoProvidersEnabled` error.
    #[must_use]
    pub fn no_providers() -> Self {
        Self::NoProvidersEnabled {
            suggestion: "Set OPENAI_API_KEY, ANTHROPIC_API_KEY or GEMINI_API_KEY, or pass --provider"
                .to_string(),
        }
    }

    /// Creates a `ProviderNotRegistered` error.
    #[must_use]
    pub fn provider_not_registered(provider: &str) -> Self {
        Self::ProviderNotRegistered {
            provider: provider.to_string(),
            suggestion: format!("Configure an API key for '{provider}' or remove it from the provider list"),
        }
    }

    /// Creates an `InvalidSetting` error.
    #[must_use]
    pub fn invalid(field: &'static str, value: impl ToString, expected: &'static str) -> Self {
        Self::InvalidSetting {
            field,
            value: value.to_string(),
            expected,
        }
    }
}
