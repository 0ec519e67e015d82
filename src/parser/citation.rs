//! Explicit-citation scan: `Source: [name] - URL: ...` pairs and markdown links.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use super::url::clean_url_trailing;

/// `Source|Site|Reference: [name] - URL|Link: <url>`, on one line or with the
/// URL marker on the following line. Markdown emphasis around markers is
/// tolerated.
#[allow(clippy::expect_used)]
static EXPLICIT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(?:source|site|reference|référence)\**\s*:\s*\**\s*",
        r"(?:\[([^\]\n]*)\]|([^\n]*?))\**",
        r"(?:\s*[-–—|]\s*|[ \t]*\r?\n[ \t]*(?:[-*]\s*)?)",
        r"\**(?:url|link|lien)\**\s*:\s*\**\s*<?",
        r#"((?:https?://|www\.)[^\s<>"'\]]+)"#,
    ))
    .expect("explicit citation regex is valid") // Static pattern, safe to panic
});

/// `[name](url)` with one level of balanced parentheses inside the URL.
#[allow(clippy::expect_used)]
static MARKDOWN_LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]\n]+)\]\(((?:https?://|www\.)[^\s()]+(?:\([^\s()]*\)[^\s()]*)*)\)")
        .expect("markdown link regex is valid") // Static pattern, safe to panic
});

/// One citation with the byte span of its URL in the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Citation {
    pub url: String,
    pub name: String,
    pub span: Range<usize>,
}

/// Finds explicit citations in `text`, in text order.
pub(crate) fn scan(text: &str) -> Vec<Citation> {
    let mut citations: Vec<Citation> = Vec::new();

    for caps in EXPLICIT_PATTERN.captures_iter(text) {
        let Some(url_match) = caps.get(3) else {
            continue;
        };
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        let url = clean_url_trailing(url_match.as_str());
        trace!(url, name, "explicit citation");
        citations.push(Citation {
            url: url.to_string(),
            name: clean_name(name),
            span: url_match.start()..url_match.start() + url.len(),
        });
    }

    for caps in MARKDOWN_LINK_PATTERN.captures_iter(text) {
        let (Some(name), Some(url_match)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if citations.iter().any(|c| overlaps(&c.span, &url_match.range())) {
            continue;
        }
        trace!(url = url_match.as_str(), name = name.as_str(), "markdown citation");
        citations.push(Citation {
            url: url_match.as_str().to_string(),
            name: clean_name(name.as_str()),
            span: url_match.range(),
        });
    }

    citations.sort_by_key(|c| c.span.start);
    citations
}

pub(crate) fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Trims whitespace, emphasis markers and stray brackets from a display name.
fn clean_name(name: &str) -> String {
    name.trim_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '_' | '[' | ']' | '"'))
        .to_string()
}
