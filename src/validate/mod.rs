//! Candidate validation and normalization.
//!
//! The validator never fails: a bad candidate is simply excluded. Use
//! [`UrlValidator::check`] when the rejection reason matters (audit counts,
//! debugging), [`UrlValidator::validate`] otherwise.
//!
//! Rejection rules apply in order and the first match wins:
//!
//! 1. no scheme and host after normalization ([`Rejection::Malformed`])
//! 2. blocklisted host or search-result page ([`Rejection::Blocklisted`])
//! 3. canonical URL shorter than 15 characters ([`Rejection::TooShort`])
//! 4. scheme other than http/https ([`Rejection::UnsupportedScheme`])

mod normalize;

pub use normalize::MAX_URL_LENGTH;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::trace;

use crate::policy::{BlockKind, SourcePolicy};
use crate::scoring::{ConfidenceSeed, ReliabilityScorer};
use crate::source::{SourceCandidate, ValidatedSource};

/// Canonical URLs shorter than this are too generic to keep.
pub const MIN_CANONICAL_LENGTH: usize = 15;

/// Why a candidate was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// Missing scheme or host.
    Malformed,
    /// Host or page is on a blocklist.
    Blocklisted {
        /// Which blocklist matched
        kind: BlockKind,
    },
    /// Canonical URL below the minimum length.
    TooShort,
    /// Scheme is not http or https.
    UnsupportedScheme,
}

impl Rejection {
    /// Stable label used for audit counters.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::Blocklisted { .. } => "blocklisted",
            Self::TooShort => "too_short",
            Self::UnsupportedScheme => "unsupported_scheme",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters candidates and turns the survivors into scored sources.
#[derive(Debug, Clone)]
pub struct UrlValidator {
    policy: Arc<SourcePolicy>,
    scorer: ReliabilityScorer,
}

impl UrlValidator {
    /// Creates a validator sharing `policy` with its reliability scorer.
    #[must_use]
    pub fn new(policy: Arc<SourcePolicy>) -> Self {
        let scorer = ReliabilityScorer::new(Arc::clone(&policy));
        Self { policy, scorer }
    }

    /// The policy the validator was built with.
    #[must_use]
    pub fn policy(&self) -> &SourcePolicy {
        &self.policy
    }

    /// The reliability scorer sharing this validator's policy.
    #[must_use]
    pub fn scorer(&self) -> &ReliabilityScorer {
        &self.scorer
    }

    /// Validates `candidate`, returning `None` when any rule rejects it.
    #[must_use]
    pub fn validate(&self, candidate: &SourceCandidate) -> Option<ValidatedSource> {
        self.check(candidate).ok()
    }

    /// Validates `candidate`, reporting the first rule that rejects it.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] of the first failing rule.
    pub fn check(&self, candidate: &SourceCandidate) -> Result<ValidatedSource, Rejection> {
        let Some(url) = normalize::canonicalize(&candidate.raw_url, &self.policy) else {
            trace!(url = %candidate.raw_url, "candidate rejected: malformed");
            return Err(Rejection::Malformed);
        };
        let host = url.host_str().unwrap_or_default();

        if let Some(kind) = self.policy.block_reason(host, url.path()) {
            trace!(url = %url, ?kind, "candidate rejected: blocklisted");
            return Err(Rejection::Blocklisted { kind });
        }
        if url.as_str().len() < MIN_CANONICAL_LENGTH {
            trace!(url = %url, "candidate rejected: too short");
            return Err(Rejection::TooShort);
        }
        if !matches!(url.scheme(), "http" | "https") {
            trace!(url = %url, scheme = url.scheme(), "candidate rejected: unsupported scheme");
            return Err(Rejection::UnsupportedScheme);
        }

        let domain = normalize::canonical_domain(&url);
        let seed = ConfidenceSeed::assess(
            candidate.strategy,
            &url,
            self.policy.path_has_keyword(url.path()),
        );

        Ok(ValidatedSource {
            canonical_url: url.to_string(),
            reliability: self.scorer.score(&domain),
            domain,
            display_name: candidate.display_name.clone(),
            seed,
            extraction_confidence: seed.score(),
            providers: BTreeSet::from([candidate.provider.clone()]),
            strategy: candidate.strategy,
            round: candidate.round,
            reachable: None,
            context: candidate.context.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::policy::Vertical;
    use crate::provider::ProviderId;
    use crate::source::{ParseStrategy, Round};

    fn validator() -> UrlValidator {
        UrlValidator::new(Arc::new(SourcePolicy::for_vertical(Vertical::Finance)))
    }

    fn candidate(url: &str, strategy: ParseStrategy) -> SourceCandidate {
        SourceCandidate::new(url, "", ProviderId::from("openai"), strategy, Round::Initial)
    }

    #[test]
    fn test_google_search_always_rejected() {
        let v = validator();
        for url in [
            "https://www.google.com/search?q=banques+en+ligne",
            "google.com/search?q=x",
            "HTTPS://GOOGLE.COM/search",
        ] {
            assert_eq!(
                v.check(&candidate(url, ParseStrategy::ExplicitCitation)).unwrap_err(),
                Rejection::Blocklisted {
                    kind: BlockKind::SearchEngine
                },
                "{url}"
            );
        }
    }

    #[test]
    fn test_rejection_order_malformed_first() {
        let v = validator();
        assert_eq!(
            v.check(&candidate("http://", ParseStrategy::BareUrl)).unwrap_err(),
            Rejection::Malformed
        );
    }

    #[test]
    fn test_bare_root_is_too_short() {
        let v = validator();
        assert_eq!(
            v.check(&candidate("https://a.com/", ParseStrategy::BareUrl)).unwrap_err(),
            Rejection::TooShort
        );
    }

    #[test]
    fn test_non_web_scheme_rejected_last() {
        let v = validator();
        assert_eq!(
            v.check(&candidate("ftp://files.example.com/report.pdf", ParseStrategy::BareUrl))
                .unwrap_err(),
            Rejection::UnsupportedScheme
        );
    }

    #[test]
    fn test_explicit_citation_confidence_at_least_point_eight() {
        let v = validator();
        let source = v
            .validate(&candidate("https://x.org/abcd", ParseStrategy::ExplicitCitation))
            .unwrap();
        assert!(source.extraction_confidence >= 0.8);
    }

    #[test]
    fn test_validated_source_fields() {
        let v = validator();
        let source = v
            .validate(&SourceCandidate::new(
                "www.amf-france.org/fr/espace-epargnants/guide?utm_source=llm",
                "AMF",
                ProviderId::from("anthropic"),
                ParseStrategy::ExplicitCitation,
                Round::FollowUp,
            ))
            .unwrap();
        assert_eq!(
            source.canonical_url,
            "https://www.amf-france.org/fr/espace-epargnants/guide"
        );
        assert_eq!(source.domain, "amf-france.org");
        assert_eq!(source.display_name, "AMF");
        // 0.5 + 0.3 + 0.1 length + 0.1 depth + 0.05 keyword
        assert_eq!(source.seed.millis(), 1050);
        assert!((source.reliability - 0.75).abs() < f64::EPSILON);
        assert_eq!(source.round, Round::FollowUp);
        assert_eq!(source.reachable, None);
        assert_eq!(source.providers.len(), 1);
    }
}
