//! Harvester Core Library
//!
//! This library asks several LLM providers the same research question,
//! harvests the sources they cite, and returns one deduplicated, ranked list
//! of validated source URLs.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`query`] - Validated research query and configuration errors
//! - [`prompt`] - Prompt text for each round
//! - [`provider`] - Provider capability and HTTP adapters
//! - [`parser`] - Citation, structured and bare-URL extraction
//! - [`validate`] - URL normalization and rejection rules
//! - [`scoring`] - Extraction confidence and domain reliability
//! - [`policy`] - Blocklists, authority tiers and vertical keywords
//! - [`dedup`] - Cross-provider merge
//! - [`followup`] - Follow-up round control
//! - [`orchestrator`] - End-to-end run
//! - [`reachability`] - Optional HEAD probes of final sources

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod dedup;
pub mod followup;
pub mod orchestrator;
pub mod parser;
pub mod policy;
pub mod prompt;
pub mod provider;
pub mod query;
pub mod reachability;
pub mod scoring;
pub mod source;
pub mod validate;

mod user_agent;

// Re-export commonly used types
pub use followup::{FollowUpController, FollowUpRequest, FollowUpState};
pub use orchestrator::{
    DEFAULT_PROVIDER_TIMEOUT, ExtractionAudit, ExtractionOrchestrator, ExtractionResult,
    FailureRecord,
};
pub use parser::parse_response;
pub use policy::{SourcePolicy, Vertical};
pub use prompt::{PromptBuilder, PromptKind};
pub use provider::{
    AnthropicProvider, GeminiProvider, OpenAiProvider, Provider, ProviderError, ProviderFamily,
    ProviderId, build_default_providers,
};
pub use query::{ConfigError, ResearchQuery};
pub use reachability::{ReachabilityChecker, ReachabilityError};
pub use scoring::{ReliabilityScorer, ReliabilityTier};
pub use source::{ParseStrategy, Round, SourceCandidate, ValidatedSource};
pub use validate::{Rejection, UrlValidator};
