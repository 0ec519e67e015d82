//! Extraction-confidence seed, kept in exact thousandths.

use serde::Serialize;
use url::Url;

use crate::source::ParseStrategy;

const BASE: u32 = 500;
const CITATION_BONUS: u32 = 300;
const LENGTH_BONUS: u32 = 100;
const DEPTH_BONUS: u32 = 100;
const KEYWORD_BONUS: u32 = 50;
const CORROBORATION_BONUS: u32 = 100;
const CAP: u32 = 1200;

/// URLs longer than this earn the length bonus.
const LENGTH_THRESHOLD: usize = 20;

/// Upper bound of extraction confidence after corroboration.
pub const MAX_CONFIDENCE: f64 = 1.2;

/// Confidence earned by a single record before cross-provider corroboration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct ConfidenceSeed(u32);

impl ConfidenceSeed {
    /// Computes the seed for a normalized URL.
    ///
    /// `keyword_hit` reports whether the path contains a domain keyword.
    #[must_use]
    pub fn assess(strategy: ParseStrategy, canonical: &Url, keyword_hit: bool) -> Self {
        let mut millis = BASE;
        if strategy.is_cited() {
            millis += CITATION_BONUS;
        }
        if canonical.as_str().len() > LENGTH_THRESHOLD {
            millis += LENGTH_BONUS;
        }
        let segments = canonical
            .path_segments()
            .map_or(0, |segments| segments.filter(|s| !s.is_empty()).count());
        if segments > 1 {
            millis += DEPTH_BONUS;
        }
        if keyword_hit {
            millis += KEYWORD_BONUS;
        }
        Self(millis)
    }

    /// Seed in thousandths.
    #[must_use]
    pub fn millis(self) -> u32 {
        self.0
    }

    /// Seed as a confidence value.
    #[must_use]
    pub fn score(self) -> f64 {
        f64::from(self.0) / 1000.0
    }

    /// Confidence in thousandths after `extra_providers` corroborating providers.
    #[must_use]
    pub fn corroborated_millis(self, extra_providers: usize) -> u32 {
        let extra = u32::try_from(extra_providers).unwrap_or(u32::MAX);
        extra
            .saturating_mul(CORROBORATION_BONUS)
            .saturating_add(self.0)
            .min(CAP)
    }

    /// Confidence after `extra_providers` additional corroborating providers.
    #[must_use]
    pub fn with_corroboration(self, extra_providers: usize) -> f64 {
        f64::from(self.corroborated_millis(extra_providers)) / 1000.0
    }
}
