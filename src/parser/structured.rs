//! Structured-format scan: JSON bodies, fenced JSON blocks, or the outermost
//! JSON-looking span of a response.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::trace;

/// Fenced code blocks tagged `json` (or untagged).
#[allow(clippy::expect_used)]
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n(.*?)```").expect("fence regex is valid") // Static pattern, safe to panic
});

/// Keys holding the entry list in an object body.
const LIST_KEYS: &[&str] = &["sources", "urls", "citations", "references"];

/// Keys holding an entry's URL.
const URL_KEYS: &[&str] = &["url", "link", "URL", "href"];

/// Keys holding an entry's display name.
const NAME_KEYS: &[&str] = &["name", "source_name", "title", "nom", "source"];

/// One `(url, name)` entry from a structured block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry {
    pub url: String,
    pub name: String,
}

/// Extracts entries from the first structured block found in `text`.
///
/// Lookup order: the whole body, then every fenced block, then the outermost
/// `{...}` and `[...]` spans. Text with no parseable block yields nothing.
pub(crate) fn scan(text: &str) -> Vec<Entry> {
    let trimmed = text.trim();
    if let Some(value) = parse_json(trimmed) {
        return entries_of(&value);
    }

    let fenced: Vec<Value> = FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|block| parse_json(block.as_str().trim()))
        .collect();
    if !fenced.is_empty() {
        trace!(blocks = fenced.len(), "structured scan using fenced blocks");
        return fenced.iter().flat_map(entries_of).collect();
    }

    [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| outer_span(text, open, close))
        .find_map(parse_json)
        .map(|value| entries_of(&value))
        .unwrap_or_default()
}

fn parse_json(text: &str) -> Option<Value> {
    if !(text.starts_with('{') || text.starts_with('[')) {
        return None;
    }
    serde_json::from_str(text).ok()
}

fn outer_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

fn entries_of(value: &Value) -> Vec<Entry> {
    match value {
        Value::Array(items) => items.iter().filter_map(entry_of).collect(),
        Value::Object(map) => {
            let listed: Vec<Entry> = LIST_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .flat_map(|list| match list {
                    Value::Array(items) => items.iter().filter_map(entry_of).collect(),
                    _ => Vec::new(),
                })
                .collect();
            if listed.is_empty() {
                entry_of(value).into_iter().collect()
            } else {
                listed
            }
        }
        _ => Vec::new(),
    }
}

fn entry_of(value: &Value) -> Option<Entry> {
    match value {
        Value::String(url) => non_empty(url).map(|url| Entry {
            url,
            name: String::new(),
        }),
        Value::Object(map) => {
            let url = URL_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str).and_then(non_empty))?;
            let name = NAME_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str).and_then(non_empty))
                .unwrap_or_default();
            Some(Entry { url, name })
        }
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_body_object() {
        let body = r#"{"answer": "...", "sources": [
            {"name": "AMF", "url": "https://www.amf-france.org/fr"},
            {"source_name": "Les Echos", "link": "https://www.lesechos.fr/finance"}
        ]}"#;
        let entries = scan(body);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "AMF");
        assert_eq!(entries[1].url, "https://www.lesechos.fr/finance");
        assert_eq!(entries[1].name, "Les Echos");
    }

    #[test]
    fn test_fenced_block_inside_prose() {
        let body = "Here you go:\n```json\n{\"urls\": [{\"url\": \"https://a.example.org/x\"}, \"https://b.example.org/y\"]}\n```\nThanks.";
        let entries = scan(body);
        assert_eq!(
            entries,
            [
                Entry {
                    url: "https://a.example.org/x".to_string(),
                    name: String::new()
                },
                Entry {
                    url: "https://b.example.org/y".to_string(),
                    name: String::new()
                }
            ]
        );
    }

    #[test]
    fn test_outermost_span_fallback() {
        let body = r#"Sources: [{"title": "BBC", "url": "https://www.bbc.com/news/business"}] end"#;
        let entries = scan(body);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "BBC");
    }

    #[test]
    fn test_entries_without_url_are_skipped() {
        let entries = scan(r#"[{"name": "No link"}, {"url": "  "}, 42]"#);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_plain_text_yields_nothing() {
        assert!(scan("No structured content, just {braces} in prose").is_empty());
    }
}
