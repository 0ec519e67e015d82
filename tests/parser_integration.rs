//! Integration tests for parsing and validating realistic provider answers.

use std::sync::Arc;

use harvester_core::{
    ParseStrategy, ProviderId, Rejection, ReliabilityTier, Round, SourcePolicy, UrlValidator,
    Vertical, dedup, parse_response,
};

fn openai() -> ProviderId {
    ProviderId::from("openai")
}

const MARKDOWN_ANSWER: &str = "\
## Les banques en ligne les moins chères

1. **Boursorama Banque** reste la moins chère selon plusieurs comparatifs.
   **Source :** [Boursorama] - **URL :** https://www.boursorama.com/banque-en-ligne/tarifs/
2. Le [comparatif de l'Observatoire](https://www.banque-france.fr/fr/statistiques/tarifs-bancaires?utm_source=chatgpt) publie les frais moyens.
3. Voir aussi https://www.moneyvox.fr/banque/comparatif-banques-en-ligne.php, ainsi que
   https://www.google.com/search?q=banque+en+ligne pour d'autres avis.

Source: [Service Public]
URL: https://www.service-public.fr/particuliers/vosdroits/F2378#section
";

#[test]
fn test_markdown_answer_yields_expected_candidates() {
    let candidates = parse_response(MARKDOWN_ANSWER, &openai(), Round::Initial);

    let explicit: Vec<_> = candidates
        .iter()
        .filter(|c| c.strategy == ParseStrategy::ExplicitCitation)
        .collect();
    assert!(explicit.iter().any(|c| c.display_name == "Boursorama"));
    assert!(explicit.iter().any(|c| c.display_name == "Service Public"));
    assert!(
        explicit
            .iter()
            .any(|c| c.raw_url.starts_with("https://www.banque-france.fr/fr/statistiques"))
    );

    let bare: Vec<_> = candidates
        .iter()
        .filter(|c| c.strategy == ParseStrategy::BareUrl)
        .map(|c| c.raw_url.as_str())
        .collect();
    assert!(bare.contains(&"https://www.moneyvox.fr/banque/comparatif-banques-en-ligne.php"));
    assert!(bare.iter().any(|u| u.starts_with("https://www.google.com/search")));
    assert!(!bare.iter().any(|u| u.contains("boursorama")));
}

#[test]
fn test_markdown_answer_validates_and_normalizes() {
    let validator = UrlValidator::new(Arc::new(SourcePolicy::for_vertical(Vertical::Finance)));
    let candidates = parse_response(MARKDOWN_ANSWER, &openai(), Round::Initial);

    let mut accepted = Vec::new();
    let mut rejections = Vec::new();
    for candidate in &candidates {
        match validator.check(candidate) {
            Ok(source) => accepted.push(source),
            Err(rejection) => rejections.push(rejection),
        }
    }

    assert!(matches!(rejections.as_slice(), [Rejection::Blocklisted { .. }]));
    let urls: Vec<&str> = accepted.iter().map(|s| s.canonical_url.as_str()).collect();
    assert!(urls.contains(&"https://www.boursorama.com/banque-en-ligne/tarifs"));
    assert!(urls.contains(&"https://www.banque-france.fr/fr/statistiques/tarifs-bancaires"));
    assert!(urls.contains(&"https://www.service-public.fr/particuliers/vosdroits/F2378"));

    let banque_france = accepted
        .iter()
        .find(|s| s.domain == "banque-france.fr")
        .unwrap();
    assert_eq!(banque_france.tier(), ReliabilityTier::VerticalAuthority);
}

#[test]
fn test_json_answer_in_fenced_block() {
    let answer = "Here is the list:\n```json\n{\"sources\": [\
        {\"name\": \"Reuters\", \"url\": \"https://www.reuters.com/business/finance/banks-fees\"},\
        {\"title\": \"Le Monde\", \"link\": \"https://www.lemonde.fr/argent/article/frais\"}\
    ]}\n```";
    let candidates = parse_response(answer, &ProviderId::from("gemini"), Round::FollowUp);

    let structured: Vec<_> = candidates
        .iter()
        .filter(|c| c.strategy == ParseStrategy::Structured)
        .collect();
    assert_eq!(structured.len(), 2);
    assert_eq!(structured[0].display_name, "Reuters");
    assert_eq!(structured[1].display_name, "Le Monde");
    assert!(structured.iter().all(|c| c.round == Round::FollowUp));
}

#[test]
fn test_answer_without_urls_yields_nothing() {
    let answer = "I cannot browse the internet, but banks usually publish fee schedules.";
    assert!(parse_response(answer, &openai(), Round::Initial).is_empty());
}

#[test]
fn test_same_url_from_two_providers_merges_once() {
    let validator = UrlValidator::new(Arc::new(SourcePolicy::default()));
    let a = parse_response(
        "Source: [Les Echos] - URL: https://www.lesechos.fr/finance-marches/banque/frais",
        &openai(),
        Round::Initial,
    );
    let b = parse_response(
        "See https://WWW.LesEchos.fr/finance-marches/banque/frais/?fbclid=abc",
        &ProviderId::from("anthropic"),
        Round::Initial,
    );
    let sources: Vec<_> = a
        .iter()
        .chain(b.iter())
        .filter_map(|c| validator.validate(c))
        .collect();
    assert_eq!(sources.len(), 2);

    let merged = dedup::merge(sources);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].canonical_url, "https://www.lesechos.fr/finance-marches/banque/frais");
    assert_eq!(merged[0].providers.len(), 2);
    assert_eq!(merged[0].display_name, "Les Echos");
    assert_eq!(merged[0].strategy, ParseStrategy::ExplicitCitation);
}
