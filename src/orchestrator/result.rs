//! Final artifact of one extraction run.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::provider::{ProviderError, ProviderId};
use crate::source::{Round, ValidatedSource};

/// One provider call that produced no usable body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// Provider that failed.
    pub provider: ProviderId,
    /// Round the call belonged to.
    pub round: Round,
    /// Why it failed.
    pub error: ProviderError,
}

/// Counters describing how the run got from raw text to the final list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionAudit {
    /// Candidates the parser produced across all responses.
    pub harvested: usize,
    /// Candidates accepted by the validator, before any merge.
    pub validated: usize,
    /// Rejected candidates by rejection reason.
    pub rejected_by_reason: BTreeMap<String, usize>,
    /// Harvested candidates by parse strategy.
    pub by_strategy: BTreeMap<String, usize>,
    /// Final sources by reliability tier.
    pub tier_distribution: BTreeMap<String, usize>,
    /// Distinct domains among final sources.
    pub unique_domains: usize,
    /// Final sources that answered the probe; `None` when not checked.
    pub reachable: Option<usize>,
    /// Final sources that did not; `None` when not checked.
    pub unreachable: Option<usize>,
    /// Wall-clock time of each provider call in milliseconds, by round.
    pub response_time_ms: BTreeMap<ProviderId, BTreeMap<Round, u64>>,
}

/// Ranked, deduplicated sources plus per-provider accounting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    /// Sources in rank order.
    pub sources: Vec<ValidatedSource>,
    /// Providers that returned at least one body.
    pub succeeded_providers: BTreeSet<ProviderId>,
    /// Failed calls, in the order they were collected.
    pub failures: Vec<FailureRecord>,
    /// 1, or 2 when a follow-up round was sent.
    pub rounds_executed: u8,
    /// Final sources each provider contributed to.
    pub per_provider_counts: BTreeMap<ProviderId, usize>,
    /// Whether the final count is under the requested minimum.
    pub below_minimum: bool,
    /// Harvest and validation counters.
    pub audit: ExtractionAudit,
}

impl ExtractionResult {
    /// Providers with at least one failure record, de-duplicated.
    #[must_use]
    pub fn failed_providers(&self) -> BTreeSet<&ProviderId> {
        self.failures.iter().map(|f| &f.provider).collect()
    }
}

/// Rank order: combined score desc, provider count desc, domain, then URL.
pub(crate) fn rank_order(a: &ValidatedSource, b: &ValidatedSource) -> Ordering {
    b.combined_micros()
        .cmp(&a.combined_micros())
        .then_with(|| b.providers.len().cmp(&a.providers.len()))
        .then_with(|| a.domain.cmp(&b.domain))
        .then_with(|| a.canonical_url.cmp(&b.canonical_url))
}

/// Final source counts per provider; providers with none are listed with 0.
pub(crate) fn count_per_provider<'a>(
    sources: &[ValidatedSource],
    providers: impl IntoIterator<Item = &'a ProviderId>,
) -> BTreeMap<ProviderId, usize> {
    let mut counts: BTreeMap<ProviderId, usize> =
        providers.into_iter().map(|p| (p.clone(), 0)).collect();
    for provider in sources.iter().flat_map(|s| s.providers.iter()) {
        *counts.entry(provider.clone()).or_default() += 1;
    }
    counts
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::policy::{SourcePolicy, Vertical};
    use crate::source::{ParseStrategy, SourceCandidate};
    use crate::validate::UrlValidator;

    fn source(url: &str, provider: &str) -> ValidatedSource {
        UrlValidator::new(Arc::new(SourcePolicy::default()))
            .validate(&SourceCandidate::new(
                url,
                "",
                ProviderId::from(provider),
                ParseStrategy::BareUrl,
                Round::Initial,
            ))
            .unwrap()
    }

    #[test]
    fn test_rank_prefers_higher_combined_score() {
        let institutional = source("https://www.economie.gouv.fr/particuliers/banques", "a");
        let generic = source("https://some-blog.io/posts/about-banks", "a");
        let mut ranked = vec![generic, institutional];
        ranked.sort_by(rank_order);
        assert_eq!(ranked[0].domain, "economie.gouv.fr");
    }

    #[test]
    fn test_rank_ties_break_on_domain() {
        let mut ranked = vec![
            source("https://zeta-blog.io/posts/one", "a"),
            source("https://alpha-blog.io/posts/one", "a"),
        ];
        ranked.sort_by(rank_order);
        assert_eq!(ranked[0].domain, "alpha-blog.io");
    }

    #[test]
    fn test_rank_equal_products_fall_through_to_tie_breaks() {
        // 0.9 x 0.5 and 0.6 x 0.75 are equal, but not in f64 arithmetic
        let validator = UrlValidator::new(Arc::new(SourcePolicy::for_vertical(Vertical::Finance)));
        let cited_unclassified = validator
            .validate(&SourceCandidate::new(
                "https://zzz-site.io/page",
                "Z",
                ProviderId::from("openai"),
                ParseStrategy::ExplicitCitation,
                Round::Initial,
            ))
            .unwrap();
        let bare_authority = validator
            .validate(&SourceCandidate::new(
                "https://www.cbanque.com/tarifs",
                "",
                ProviderId::from("openai"),
                ParseStrategy::BareUrl,
                Round::Initial,
            ))
            .unwrap();
        assert_eq!(cited_unclassified.confidence_millis(), 900);
        assert_eq!(bare_authority.confidence_millis(), 600);
        assert_eq!(cited_unclassified.combined_micros(), bare_authority.combined_micros());

        let mut ranked = vec![cited_unclassified, bare_authority];
        ranked.sort_by(rank_order);
        assert_eq!(ranked[0].domain, "cbanque.com");
        assert_eq!(ranked[0].combined_score(), ranked[1].combined_score());
    }

    #[test]
    fn test_rank_ties_prefer_more_providers() {
        let single = source("https://alpha-blog.io/posts/one", "a");
        let corroborated = crate::dedup::merge(vec![
            source("https://zeta-blog.io/posts", "a"),
            source("https://zeta-blog.io/posts", "b"),
        ])
        .remove(0);
        // 0.6 seed + 0.1 bonus against 0.7 seed
        assert_eq!(single.confidence_millis(), 700);
        assert_eq!(corroborated.confidence_millis(), 700);
        let mut ranked = vec![single, corroborated];
        ranked.sort_by(rank_order);
        assert_eq!(ranked[0].domain, "zeta-blog.io");
    }

    #[test]
    fn test_count_per_provider_includes_zero_entries() {
        let counts = count_per_provider(
            &[source("https://example.org/a/b", "openai")],
            &[ProviderId::from("openai"), ProviderId::from("gemini")],
        );
        assert_eq!(counts[&ProviderId::from("openai")], 1);
        assert_eq!(counts[&ProviderId::from("gemini")], 0);
    }

    #[test]
    fn test_result_serializes_to_json() {
        let result = ExtractionResult {
            sources: vec![source("https://example.org/a/b", "openai")],
            succeeded_providers: BTreeSet::from([ProviderId::from("openai")]),
            failures: vec![FailureRecord {
                provider: ProviderId::from("gemini"),
                round: Round::Initial,
                error: ProviderError::timeout("gemini", std::time::Duration::from_secs(2)),
            }],
            rounds_executed: 1,
            per_provider_counts: BTreeMap::new(),
            below_minimum: true,
            audit: ExtractionAudit::default(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["failures"][0]["error"]["kind"], "timeout");
        assert_eq!(json["sources"][0]["providers"][0], "openai");
        assert_eq!(json["below_minimum"], true);
    }
}
