//! The immutable research query that drives one extraction run.
//!
//! A [`ResearchQuery`] is created once per run through [`QueryBuilder`] and is
//! never mutated afterwards. Building validates everything that can make a run
//! pointless, so the orchestrator only has to check provider registration.
//!
//! # Example
//!
//! ```
//! use harvester_core::query::ResearchQuery;
//!
//! let query = ResearchQuery::builder("Which online banks have the lowest fees?")
//!     .context("France, 2024")
//!     .provider("openai")
//!     .provider("anthropic")
//!     .max_sources_per_provider(10)
//!     .min_total_sources(12)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(query.enabled_providers().len(), 2);
//! ```

mod error;

pub use error::ConfigError;

use serde::Serialize;

use crate::provider::ProviderId;

/// Default cap on validated sources kept from one provider response.
pub const DEFAULT_MAX_SOURCES_PER_PROVIDER: usize = 10;

/// Default minimum total yield below which a follow-up round is issued.
pub const DEFAULT_MIN_TOTAL_SOURCES: usize = 10;

/// Upper bound accepted for the per-provider cap.
pub const MAX_SOURCES_PER_PROVIDER_LIMIT: usize = 50;

/// One research question with its run parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchQuery {
    question: String,
    context: Option<String>,
    enabled_providers: Vec<ProviderId>,
    max_sources_per_provider: usize,
    min_total_sources: usize,
}

impl ResearchQuery {
    /// Starts building a query for `question`.
    #[must_use]
    pub fn builder(question: impl Into<String>) -> QueryBuilder {
        QueryBuilder::new(question)
    }

    /// The research question, trimmed.
    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Optional free-text context appended to prompts.
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Providers to fan out to, in configuration order without duplicates.
    #[must_use]
    pub fn enabled_providers(&self) -> &[ProviderId] {
        &self.enabled_providers
    }

    /// Maximum distinct sources kept from one provider response.
    #[must_use]
    pub fn max_sources_per_provider(&self) -> usize {
        self.max_sources_per_provider
    }

    /// Minimum deduplicated total that avoids a follow-up round.
    #[must_use]
    pub fn min_total_sources(&self) -> usize {
        self.min_total_sources
    }
}

/// Validating builder for [`ResearchQuery`].
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    question: String,
    context: Option<String>,
    providers: Vec<ProviderId>,
    max_sources_per_provider: usize,
    min_total_sources: usize,
}

impl QueryBuilder {
    fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            context: None,
            providers: Vec::new(),
            max_sources_per_provider: DEFAULT_MAX_SOURCES_PER_PROVIDER,
            min_total_sources: DEFAULT_MIN_TOTAL_SOURCES,
        }
    }

    /// Sets the optional context. Blank context is treated as absent.
    #[must_use]
    pub fn context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context = if context.trim().is_empty() {
            None
        } else {
            Some(context.trim().to_string())
        };
        self
    }

    /// Enables one provider. Enabling the same provider twice is a no-op.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<ProviderId>) -> Self {
        let provider = provider.into();
        if !self.providers.contains(&provider) {
            self.providers.push(provider);
        }
        self
    }

    /// Enables every provider in `providers`.
    #[must_use]
    pub fn providers<I, P>(self, providers: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ProviderId>,
    {
        providers.into_iter().fold(self, Self::provider)
    }

    /// Sets the per-provider cap.
    #[must_use]
    pub fn max_sources_per_provider(mut self, max: usize) -> Self {
        self.max_sources_per_provider = max;
        self
    }

    /// Sets the minimum acceptable total.
    #[must_use]
    pub fn min_total_sources(mut self, min: usize) -> Self {
        self.min_total_sources = min;
        self
    }

    /// Validates and freezes the query.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyQuestion`] for a blank question,
    /// [`ConfigError::NoProvidersEnabled`] when no provider was enabled, and
    /// [`ConfigError::InvalidSetting`] when the per-provider cap is outside
    /// `1..=50`.
    pub fn build(self) -> Result<ResearchQuery, ConfigError> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(ConfigError::EmptyQuestion);
        }
        if self.providers.is_empty() {
            return Err(ConfigError::no_providers());
        }
        if !(1..=MAX_SOURCES_PER_PROVIDER_LIMIT).contains(&self.max_sources_per_provider) {
            return Err(ConfigError::invalid(
                "max_sources_per_provider",
                self.max_sources_per_provider,
                "1..=50",
            ));
        }

        Ok(ResearchQuery {
            question: question.to_string(),
            context: self.context,
            enabled_providers: self.providers,
            max_sources_per_provider: self.max_sources_per_provider,
            min_total_sources: self.min_total_sources,
        })
    }
}
