//! Citation parsing for free-text provider answers.
//!
//! Three independent strategies run over the same text and their outputs are
//! unioned; duplicates are left for the deduplicator.
//!
//! - Explicit citations: `Source: [name] - URL: ...` and markdown links
//! - Bare URLs: `http(s)://` and `www.` tokens outside explicit citations
//! - Structured blocks: JSON bodies or fenced JSON blocks
//!
//! Parsing is pure and deterministic. A response without citations yields an
//! empty vector, which is a normal outcome.
//!
//! # Example
//!
//! ```
//! use harvester_core::parser::parse_response;
//! use harvester_core::provider::ProviderId;
//! use harvester_core::source::{ParseStrategy, Round};
//!
//! let text = "Source: [AMF] - URL: https://www.amf-france.org/fr/espace-epargnants";
//! let candidates = parse_response(text, &ProviderId::from("openai"), Round::Initial);
//! assert_eq!(candidates.len(), 1);
//! assert_eq!(candidates[0].strategy, ParseStrategy::ExplicitCitation);
//! assert_eq!(candidates[0].display_name, "AMF");
//! ```

mod citation;
mod structured;
mod url;

use std::ops::Range;

use tracing::debug;

use crate::provider::ProviderId;
use crate::source::{ParseStrategy, Round, SourceCandidate};

/// Characters of response text kept on each side of a URL.
pub const CONTEXT_RADIUS: usize = 100;

/// Extracts every source candidate from a provider answer.
#[tracing::instrument(skip(text), fields(provider = %provider, round = %round, text_len = text.len()))]
#[must_use]
pub fn parse_response(text: &str, provider: &ProviderId, round: Round) -> Vec<SourceCandidate> {
    let citations = citation::scan(text);
    let cited_spans: Vec<Range<usize>> = citations.iter().map(|c| c.span.clone()).collect();
    let structured = structured::scan(text);
    let bare = url::scan(text, &cited_spans);

    debug!(
        explicit = citations.len(),
        structured = structured.len(),
        bare = bare.len(),
        "parsed provider response"
    );

    let make = |url: String, name: &str, strategy, span: Option<Range<usize>>| {
        let context = span.map(|span| context_around(text, &span)).unwrap_or_default();
        SourceCandidate::new(url, name, provider.clone(), strategy, round).with_context(context)
    };

    citations
        .into_iter()
        .map(|c| make(c.url, &c.name, ParseStrategy::ExplicitCitation, Some(c.span)))
        .chain(structured.into_iter().map(|e| {
            // JSON escapes can hide the URL from a plain search; context stays empty then
            let span = text.find(&e.url).map(|start| start..start + e.url.len());
            make(e.url, &e.name, ParseStrategy::Structured, span)
        }))
        .chain(
            bare.into_iter()
                .map(|(url, span)| make(url, "", ParseStrategy::BareUrl, Some(span))),
        )
        .collect()
}

/// Up to [`CONTEXT_RADIUS`] characters on each side of `span`, the URL
/// included, with whitespace runs collapsed to one space.
fn context_around(text: &str, span: &Range<usize>) -> String {
    let (Some(before), Some(after)) = (text.get(..span.start), text.get(span.end..)) else {
        return String::new();
    };
    let start = before
        .char_indices()
        .rev()
        .nth(CONTEXT_RADIUS - 1)
        .map_or(0, |(index, _)| index);
    let end = after
        .char_indices()
        .nth(CONTEXT_RADIUS)
        .map_or(text.len(), |(index, _)| span.end + index);
    text.get(start..end)
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
