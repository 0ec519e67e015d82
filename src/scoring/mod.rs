//! Domain reliability scoring and extraction-confidence arithmetic.
//!
//! Reliability is a property of the domain alone and never looks at how a URL
//! was extracted. Confidence (see [`ConfidenceSeed`]) is a property of the
//! extraction alone. The two only meet at ranking time.

mod confidence;

pub use confidence::{ConfidenceSeed, MAX_CONFIDENCE};

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::trace;

use crate::policy::SourcePolicy;

/// Authority tier of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityTier {
    /// Government, education, or academic index.
    Institutional,
    /// Recognized national or international press.
    Press,
    /// Authority for the question's vertical.
    VerticalAuthority,
    /// Generic commercial TLD.
    Generic,
    /// Nothing matched.
    Unclassified,
}

impl ReliabilityTier {
    /// Every tier, most authoritative first.
    pub const ALL: [Self; 5] = [
        Self::Institutional,
        Self::Press,
        Self::VerticalAuthority,
        Self::Generic,
        Self::Unclassified,
    ];

    /// Reliability of the tier in thousandths.
    #[must_use]
    pub fn millis(self) -> u32 {
        match self {
            Self::Institutional => 900,
            Self::Press => 800,
            Self::VerticalAuthority => 750,
            Self::Generic => 600,
            Self::Unclassified => 500,
        }
    }

    /// Reliability score of the tier.
    #[must_use]
    pub fn score(self) -> f64 {
        f64::from(self.millis()) / 1000.0
    }

    /// Tier whose score is closest to `score`.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        Self::ALL
            .into_iter()
            .min_by(|a, b| {
                (a.score() - score)
                    .abs()
                    .total_cmp(&(b.score() - score).abs())
            })
            .unwrap_or(Self::Unclassified)
    }

    /// Stable snake-case label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Institutional => "institutional",
            Self::Press => "press",
            Self::VerticalAuthority => "vertical_authority",
            Self::Generic => "generic",
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for ReliabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true when `domain` is `pattern` or a subdomain of it.
pub(crate) fn domain_matches(domain: &str, pattern: &str) -> bool {
    domain == pattern
        || (domain.len() > pattern.len()
            && domain.ends_with(pattern)
            && domain.as_bytes()[domain.len() - pattern.len() - 1] == b'.')
}

/// Table-driven reliability lookup over a [`SourcePolicy`].
#[derive(Debug, Clone)]
pub struct ReliabilityScorer {
    policy: Arc<SourcePolicy>,
}

impl ReliabilityScorer {
    /// Creates a scorer over `policy`.
    #[must_use]
    pub fn new(policy: Arc<SourcePolicy>) -> Self {
        Self { policy }
    }

    /// Tier of `domain`.
    ///
    /// The longest matching rule wins; rules of equal length resolve to the
    /// more authoritative tier.
    #[must_use]
    pub fn classify(&self, domain: &str) -> ReliabilityTier {
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        let best = self
            .policy
            .authority_rules()
            .filter(|(pattern, _)| domain_matches(&domain, pattern))
            .max_by(|(pa, ta), (pb, tb)| pa.len().cmp(&pb.len()).then(tb.cmp(ta)));

        match best {
            Some((pattern, tier)) => {
                trace!(domain = %domain, rule = pattern, tier = %tier, "reliability rule matched");
                tier
            }
            None => ReliabilityTier::Unclassified,
        }
    }

    /// Reliability of `domain` in `[0.5, 0.9]`.
    #[must_use]
    pub fn score(&self, domain: &str) -> f64 {
        self.classify(domain).score()
    }
}
