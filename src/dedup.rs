//! Cross-provider deduplication.
//!
//! [`merge`] groups records by canonical URL and collapses each group into one
//! representative. The representative is chosen by a total order, so the result
//! does not depend on input order, and confidence is always recomputed from the
//! representative's seed, so merging an already merged set changes nothing.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument};

use crate::source::ValidatedSource;

/// Representative preference: highest seed, then strategy, earliest round,
/// named before unnamed, then name, providers and context for a total order.
fn representative_order(a: &ValidatedSource, b: &ValidatedSource) -> Ordering {
    b.seed
        .cmp(&a.seed)
        .then_with(|| a.strategy.preference().cmp(&b.strategy.preference()))
        .then_with(|| a.round.cmp(&b.round))
        .then_with(|| a.display_name.is_empty().cmp(&b.display_name.is_empty()))
        .then_with(|| a.display_name.cmp(&b.display_name))
        .then_with(|| a.providers.cmp(&b.providers))
        .then_with(|| a.context.cmp(&b.context))
}

/// Merges records sharing a canonical URL, ordered by canonical URL.
#[instrument(skip(sources), fields(input = sources.len()))]
#[must_use]
pub fn merge(sources: Vec<ValidatedSource>) -> Vec<ValidatedSource> {
    let mut groups: BTreeMap<String, Vec<ValidatedSource>> = BTreeMap::new();
    for source in sources {
        groups.entry(source.canonical_url.clone()).or_default().push(source);
    }

    let merged: Vec<ValidatedSource> = groups.into_values().filter_map(merge_group).collect();
    debug!(output = merged.len(), "merged sources");
    merged
}

fn merge_group(mut group: Vec<ValidatedSource>) -> Option<ValidatedSource> {
    group.sort_by(representative_order);

    let providers: BTreeSet<_> = group.iter().flat_map(|s| s.providers.iter().cloned()).collect();
    let display_name = group
        .iter()
        .map(|s| s.display_name.as_str())
        .find(|name| !name.is_empty())
        .unwrap_or_default()
        .to_string();
    let round = group.iter().map(|s| s.round).min()?;
    let reachable = group
        .iter()
        .filter_map(|s| s.reachable)
        .reduce(|a, b| a || b);

    let mut representative = group.into_iter().next()?;
    representative.extraction_confidence = representative
        .seed
        .with_corroboration(providers.len().saturating_sub(1));
    representative.providers = providers;
    representative.display_name = display_name;
    representative.round = round;
    representative.reachable = reachable;
    Some(representative)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::policy::SourcePolicy;
    use crate::provider::ProviderId;
    use crate::scoring::MAX_CONFIDENCE;
    use crate::source::{ParseStrategy, Round, SourceCandidate};
    use crate::validate::UrlValidator;

    fn source(url: &str, name: &str, provider: &str, strategy: ParseStrategy, round: Round) -> ValidatedSource {
        UrlValidator::new(Arc::new(SourcePolicy::default()))
            .validate(&SourceCandidate::new(
                url,
                name,
                ProviderId::from(provider),
                strategy,
                round,
            ))
            .unwrap()
    }

    #[test]
    fn test_merge_unions_providers_and_applies_bonus() {
        let merged = merge(vec![
            source("https://example.org/guide/a", "Example", "openai", ParseStrategy::ExplicitCitation, Round::Initial),
            source("https://example.org/guide/a", "", "anthropic", ParseStrategy::BareUrl, Round::Initial),
        ]);
        assert_eq!(merged.len(), 1);
        let merged = &merged[0];
        assert_eq!(merged.providers.len(), 2);
        assert_eq!(merged.strategy, ParseStrategy::ExplicitCitation);
        assert_eq!(merged.display_name, "Example");
        // seed 1.05 + one corroborating provider
        assert!((merged.extraction_confidence - 1.15).abs() < 1e-9);
    }

    #[test]
    fn test_merge_caps_confidence() {
        let records: Vec<_> = ["a", "b", "c", "d", "e"]
            .into_iter()
            .map(|p| source("https://example.org/guide/a", "X", p, ParseStrategy::ExplicitCitation, Round::Initial))
            .collect();
        let merged = merge(records);
        assert!((merged[0].extraction_confidence - MAX_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let records = vec![
            source("https://example.org/x/y", "", "gemini", ParseStrategy::BareUrl, Round::FollowUp),
            source("https://example.org/x/y", "Name B", "openai", ParseStrategy::Structured, Round::Initial),
            source("https://example.org/x/y", "Name A", "anthropic", ParseStrategy::ExplicitCitation, Round::Initial),
            source("https://other.org/page/1", "", "openai", ParseStrategy::BareUrl, Round::Initial),
        ];
        let expected = merge(records.clone());
        assert_eq!(expected.len(), 2);
        assert_eq!(expected[0].canonical_url, "https://example.org/x/y");
        assert_eq!(expected[0].round, Round::Initial);

        let orderings = permutations(&records);
        assert_eq!(orderings.len(), 24);
        for ordering in orderings {
            assert_eq!(merge(ordering), expected);
        }
    }

    fn permutations(items: &[ValidatedSource]) -> Vec<Vec<ValidatedSource>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut all = Vec::new();
        for (index, first) in items.iter().enumerate() {
            let mut rest = items.to_vec();
            rest.remove(index);
            for mut tail in permutations(&rest) {
                tail.insert(0, first.clone());
                all.push(tail);
            }
        }
        all
    }

    #[test]
    fn test_merge_keeps_representative_context() {
        let validator = UrlValidator::new(Arc::new(SourcePolicy::default()));
        let cited = validator
            .validate(
                &SourceCandidate::new(
                    "https://example.org/guide/a",
                    "Example",
                    ProviderId::from("openai"),
                    ParseStrategy::ExplicitCitation,
                    Round::Initial,
                )
                .with_context("Source: [Example] - URL: https://example.org/guide/a"),
            )
            .unwrap();
        let bare = validator
            .validate(
                &SourceCandidate::new(
                    "https://example.org/guide/a",
                    "",
                    ProviderId::from("gemini"),
                    ParseStrategy::BareUrl,
                    Round::Initial,
                )
                .with_context("see https://example.org/guide/a"),
            )
            .unwrap();

        let merged = merge(vec![bare, cited]);
        assert_eq!(merged[0].context, "Source: [Example] - URL: https://example.org/guide/a");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let once = merge(vec![
            source("https://example.org/x/y", "A", "openai", ParseStrategy::ExplicitCitation, Round::Initial),
            source("https://example.org/x/y", "", "gemini", ParseStrategy::BareUrl, Round::Initial),
        ]);
        let twice = merge(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_empty_names_stay_empty() {
        let merged = merge(vec![
            source("https://example.org/x/y", "", "openai", ParseStrategy::BareUrl, Round::Initial),
            source("https://example.org/x/y", "", "gemini", ParseStrategy::BareUrl, Round::Initial),
        ]);
        assert!(merged[0].display_name.is_empty());
    }

    #[test]
    fn test_canonical_urls_unique_after_merge() {
        let merged = merge(vec![
            source("https://Example.org/x/y/", "", "openai", ParseStrategy::BareUrl, Round::Initial),
            source("https://example.org/x/y?utm_source=a", "", "gemini", ParseStrategy::BareUrl, Round::Initial),
            source("https://example.org/x/z", "", "gemini", ParseStrategy::BareUrl, Round::Initial),
        ]);
        let urls: BTreeSet<&str> = merged.iter().map(|s| s.canonical_url.as_str()).collect();
        assert_eq!(urls.len(), merged.len());
        assert_eq!(merged.len(), 2);
    }
}
