//! Source records flowing through one extraction run.
//!
//! A [`SourceCandidate`] is what the parser pulls out of response text. The
//! validator turns accepted candidates into [`ValidatedSource`] records, which
//! the deduplicator merges and the orchestrator ranks.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::provider::ProviderId;
use crate::scoring::{ConfidenceSeed, ReliabilityTier};

/// Fan-out cycle a record was harvested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Round {
    /// First fan-out with the main (or structured) prompt.
    Initial,
    /// The single supplemental round for under-target providers.
    FollowUp,
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => f.write_str("initial"),
            Self::FollowUp => f.write_str("follow_up"),
        }
    }
}

/// Parser strategy that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    /// `Source: [name] - URL: ...` pairs and markdown links.
    ExplicitCitation,
    /// Free-standing URL tokens.
    BareUrl,
    /// Entries of a JSON block.
    Structured,
}

impl ParseStrategy {
    /// Every strategy, in report order.
    pub const ALL: [Self; 3] = [Self::ExplicitCitation, Self::Structured, Self::BareUrl];

    /// Whether the strategy pairs a URL with an explicit citation marker.
    #[must_use]
    pub fn is_cited(self) -> bool {
        matches!(self, Self::ExplicitCitation | Self::Structured)
    }

    /// Preference when two records tie on confidence; lower wins.
    #[must_use]
    pub(crate) fn preference(self) -> u8 {
        match self {
            Self::ExplicitCitation => 0,
            Self::Structured => 1,
            Self::BareUrl => 2,
        }
    }

    /// Stable snake-case label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExplicitCitation => "explicit_citation",
            Self::BareUrl => "bare_url",
            Self::Structured => "structured",
        }
    }
}

impl fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated (name, URL) pair harvested from one response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCandidate {
    /// URL text as found, after trailing-punctuation cleanup.
    pub raw_url: String,
    /// Display name; empty when the response gave none.
    pub display_name: String,
    /// Provider whose response contained the candidate.
    pub provider: ProviderId,
    /// Strategy that found it.
    pub strategy: ParseStrategy,
    /// Round the response belongs to.
    pub round: Round,
    /// Response text around the URL, whitespace collapsed; may be empty.
    pub context: String,
}

impl SourceCandidate {
    /// Creates a candidate, trimming the display name.
    #[must_use]
    pub fn new(
        raw_url: impl Into<String>,
        display_name: &str,
        provider: ProviderId,
        strategy: ParseStrategy,
        round: Round,
    ) -> Self {
        Self {
            raw_url: raw_url.into(),
            display_name: display_name.trim().to_string(),
            provider,
            strategy,
            round,
            context: String::new(),
        }
    }

    /// Attaches the response text surrounding the URL.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// A normalized, scored source URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedSource {
    /// Normalized URL; unique within a merged set.
    pub canonical_url: String,
    /// Host without a leading `www.`.
    pub domain: String,
    /// Display name; may be empty.
    pub display_name: String,
    /// Confidence before any corroboration bonus.
    #[serde(skip)]
    pub seed: ConfidenceSeed,
    /// Extraction confidence in `[0, 1.2]`.
    pub extraction_confidence: f64,
    /// Domain reliability in `[0.5, 0.9]`.
    pub reliability: f64,
    /// Providers that cited this URL.
    pub providers: BTreeSet<ProviderId>,
    /// Strategy of the representative record.
    pub strategy: ParseStrategy,
    /// Earliest round the URL was seen in.
    pub round: Round,
    /// Reachability; `None` when not checked.
    pub reachable: Option<bool>,
    /// Response text around the URL in the representative record.
    pub context: String,
}

impl ValidatedSource {
    /// Extraction confidence in thousandths, corroboration included.
    #[must_use]
    pub fn confidence_millis(&self) -> u32 {
        self.seed
            .corroborated_millis(self.providers.len().saturating_sub(1))
    }

    /// Ranking score in millionths: confidence thousandths times tier thousandths.
    ///
    /// Integer so that mathematically equal scores compare equal.
    #[must_use]
    pub fn combined_micros(&self) -> u32 {
        self.confidence_millis() * self.tier().millis()
    }

    /// Ranking score: extraction confidence times reliability.
    #[must_use]
    pub fn combined_score(&self) -> f64 {
        f64::from(self.combined_micros()) / 1_000_000.0
    }

    /// Reliability tier the domain falls into.
    #[must_use]
    pub fn tier(&self) -> ReliabilityTier {
        ReliabilityTier::from_score(self.reliability)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_orders_initial_first() {
        assert!(Round::Initial < Round::FollowUp);
        assert_eq!(Round::FollowUp.to_string(), "follow_up");
    }

    #[test]
    fn test_strategy_cited_flags() {
        assert!(ParseStrategy::ExplicitCitation.is_cited());
        assert!(ParseStrategy::Structured.is_cited());
        assert!(!ParseStrategy::BareUrl.is_cited());
    }

    #[test]
    fn test_candidate_trims_display_name() {
        let candidate = SourceCandidate::new(
            "https://example.org/a",
            "  Example  ",
            ProviderId::from("openai"),
            ParseStrategy::ExplicitCitation,
            Round::Initial,
        );
        assert_eq!(candidate.display_name, "Example");
    }

    #[test]
    fn test_candidate_serializes_snake_case_enums() {
        let candidate = SourceCandidate::new(
            "https://example.org/a",
            "",
            ProviderId::from("openai"),
            ParseStrategy::BareUrl,
            Round::FollowUp,
        );
        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["strategy"], "bare_url");
        assert_eq!(json["round"], "follow_up");
    }
}
