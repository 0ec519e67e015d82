//! Error types for provider calls.
//!
//! Every variant is recoverable at run level: the orchestrator records it in
//! the run's failure set and carries on with the remaining providers.

use serde::Serialize;
use thiserror::Error;

/// Failure of a single provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderError {
    /// The provider rejected the credentials.
    #[error(
        "authentication failed for provider '{provider}' (HTTP {status})\n  Suggestion: Check the API key for this provider"
    )]
    AuthenticationFailed {
        /// Provider identifier
        provider: String,
        /// HTTP status returned (401 or 403)
        status: u16,
    },

    /// The provider throttled the request.
    #[error("provider '{provider}' rate limited the request{}", retry_hint(.retry_after_secs))]
    RateLimited {
        /// Provider identifier
        provider: String,
        /// Delay requested by the provider, when it sent one
        retry_after_secs: Option<u64>,
    },

    /// The call did not complete within its timeout.
    #[error(
        "provider '{provider}' timed out after {after_ms} ms\n  Suggestion: Raise --timeout-secs or retry later"
    )]
    Timeout {
        /// Provider identifier
        provider: String,
        /// Timeout that elapsed, in milliseconds
        after_ms: u64,
    },

    /// The provider could not be reached or answered with an unusable status.
    #[error("provider '{provider}' unreachable: {reason}")]
    Unreachable {
        /// Provider identifier
        provider: String,
        /// Why the call failed
        reason: String,
    },

    /// The provider answered but the body could not be interpreted.
    #[error("provider '{provider}' returned a malformed response: {reason}")]
    MalformedResponse {
        /// Provider identifier
        provider: String,
        /// What was wrong with the body
        reason: String,
    },
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}

impl ProviderError {
    /// Creates an `Unreachable` error.
    #[must_use]
    pub fn unreachable(provider: &str, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `MalformedResponse` error.
    #[must_use]
    pub fn malformed(provider: &str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `Timeout` error.
    #[must_use]
    pub fn timeout(provider: &str, after: std::time::Duration) -> Self {
        Self::Timeout {
            provider: provider.to_string(),
            after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Stable label for the variant, used in logs and audit counts.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed { .. } => "authentication_failed",
            Self::RateLimited { .. } => "rate_limited",
            Self::Timeout { .. } => "timeout",
            Self::Unreachable { .. } => "unreachable",
            Self::MalformedResponse { .. } => "malformed_response",
        }
    }
}
