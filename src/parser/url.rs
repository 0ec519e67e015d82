//! Bare-URL scan over free text.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use super::citation::overlaps;

/// Regex pattern for finding URLs in text.
/// Matches `http://`, `https://` and scheme-less `www.` tokens, capturing until
/// whitespace or common delimiters.
#[allow(clippy::expect_used)]
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:https?://|\bwww\.)[^\s<>"'\]\[]+"#).expect("URL regex is valid") // Static pattern, safe to panic
});

/// Finds URL tokens whose span does not overlap any of `excluded`, with
/// the byte span of each cleaned token.
pub(crate) fn scan(text: &str, excluded: &[Range<usize>]) -> Vec<(String, Range<usize>)> {
    let mut urls = Vec::new();

    for url_match in URL_PATTERN.find_iter(text) {
        let cleaned = clean_url_trailing(url_match.as_str());
        let span = url_match.start()..url_match.start() + cleaned.len();
        if excluded.iter().any(|ex| overlaps(ex, &span)) {
            continue;
        }
        if cleaned.len() <= "www.".len() || cleaned.ends_with("://") {
            continue;
        }
        trace!(url = %cleaned, "found bare URL candidate");
        urls.push((cleaned.to_string(), span));
    }

    urls
}

/// Cleans trailing punctuation that often gets captured with URLs.
pub(crate) fn clean_url_trailing(url: &str) -> &str {
    let mut result = url;

    while let Some(last) = result.chars().last() {
        match last {
            // Sentence punctuation, not part of the URL
            '.' | ',' | ';' | ':' | '!' | '?' | '*' | '`' => {
                result = &result[..result.len() - 1];
            }
            // Closing brackets at the end are kept only when balanced (Wikipedia URLs)
            ')' | '}' => {
                let open = if last == ')' { '(' } else { '{' };
                let open_count = result.chars().filter(|&c| c == open).count();
                let close_count = result.chars().filter(|&c| c == last).count();
                if close_count > open_count {
                    result = &result[..result.len() - 1];
                } else {
                    break;
                }
            }
            _ => break,
        }
    }

    result
}
