//! URL canonicalization.

use std::sync::LazyLock;

use regex::Regex;
use url::{Url, form_urlencoded};

use crate::policy::SourcePolicy;

/// Longest candidate text accepted (standard browser limit).
pub const MAX_URL_LENGTH: usize = 2000;

/// Scheme-less token that still looks like `host.tld[/path]`.
#[allow(clippy::expect_used)]
static HOST_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}(?::\d+)?(?:[/?#]|$)")
        .expect("host regex is valid") // Static pattern, safe to panic
});

/// Parses candidate text into a canonical [`Url`].
///
/// Returns `None` when the text has no scheme and host after the implicit
/// `https://` prefix is applied.
pub(crate) fn canonicalize(raw: &str, policy: &SourcePolicy) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > MAX_URL_LENGTH {
        return None;
    }

    let with_scheme;
    let text = if raw.contains("://") {
        raw
    } else if raw.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("www.")) || HOST_LIKE.is_match(raw) {
        with_scheme = format!("https://{raw}");
        &with_scheme
    } else {
        raw
    };

    // Scheme and host are lower-cased and default ports dropped by the parser.
    let mut url = Url::parse(text).ok()?;
    if url.host_str().is_none_or(str::is_empty) {
        return None;
    }

    strip_tracking_params(&mut url, policy);
    url.set_fragment(None);
    normalize_trailing_slash(&mut url);
    Some(url)
}

/// Drops tracking pairs. Kept pairs stay byte-for-byte as written, and a
/// query without tracking pairs is left untouched.
fn strip_tracking_params(url: &mut Url, policy: &SourcePolicy) {
    let Some(query) = url.query() else {
        return;
    };
    let pairs: Vec<&str> = query.split('&').collect();
    let kept: Vec<&str> = pairs
        .iter()
        .copied()
        .filter(|pair| !is_tracking_pair(pair, policy))
        .collect();
    if kept.len() == pairs.len() {
        return;
    }

    let kept: Vec<&str> = kept.into_iter().filter(|pair| !pair.is_empty()).collect();
    let query = (!kept.is_empty()).then(|| kept.join("&"));
    url.set_query(query.as_deref());
}

fn is_tracking_pair(pair: &str, policy: &SourcePolicy) -> bool {
    form_urlencoded::parse(pair.as_bytes())
        .next()
        .is_some_and(|(name, _)| policy.is_tracking_param(&name))
}

/// Non-root paths lose every trailing slash; the root stays `/`.
fn normalize_trailing_slash(url: &mut Url) {
    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
        url.set_path(&trimmed);
    }
}

/// Host without a leading `www.`.
pub(crate) fn canonical_domain(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}
