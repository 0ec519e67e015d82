//! Read-only source policy: blocklists, tracking parameters, domain keywords
//! and authority allowlists.
//!
//! A [`SourcePolicy`] is built once per run (usually from a [`Vertical`]
//! preset plus configuration overrides) and shared through an `Arc` by the
//! validator and the reliability scorer. Nothing mutates it afterwards.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::scoring::{ReliabilityTier, domain_matches};

/// Search engines; blocked on the exact host or its `www.` form.
const SEARCH_ENGINES: &[&str] = &[
    "google.com",
    "google.fr",
    "bing.com",
    "yahoo.com",
    "search.yahoo.com",
    "duckduckgo.com",
    "qwant.com",
];

/// Social platforms; blocked on the host and every subdomain.
const SOCIAL_PLATFORMS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "linkedin.com",
    "youtube.com",
    "tiktok.com",
];

/// URL shorteners; always blocked.
const URL_SHORTENERS: &[&str] = &[
    "bit.ly",
    "t.co",
    "tinyurl.com",
    "goo.gl",
    "ow.ly",
    "a.co",
    "amzn.to",
    "youtu.be",
    "short.ly",
];

/// Path fragments marking an official brand profile on a social platform.
const OFFICIAL_PROFILE_MARKERS: &[&str] = &["/company/", "/official/", "/pages/"];

/// Query parameters removed during normalization.
const TRACKING_PARAMS: &[&str] = &["gclid", "fbclid", "msclkid", "mc_cid", "mc_eid"];

/// Query parameter prefixes removed during normalization.
const TRACKING_PARAM_PREFIXES: &[&str] = &["utm_"];

const INSTITUTIONAL_SUFFIXES: &[&str] = &["gov", "edu", "gouv.fr", "gov.uk", "ac.uk", "europa.eu"];

const ACADEMIC_INDEXES: &[&str] = &[
    "scholar.google.com",
    "nature.com",
    "science.org",
    "pubmed.ncbi.nlm.nih.gov",
    "wikipedia.org",
    "arxiv.org",
    "jstor.org",
];

const PRESS: &[&str] = &[
    "lemonde.fr",
    "lefigaro.fr",
    "liberation.fr",
    "bbc.com",
    "bbc.co.uk",
    "reuters.com",
    "ap.org",
    "wsj.com",
    "ft.com",
    "economist.com",
    "lesechos.fr",
    "latribune.fr",
    "lepoint.fr",
    "franceinfo.fr",
    "nytimes.com",
    "theguardian.com",
];

const GENERIC_TLDS: &[&str] = &["com", "fr", "org", "net"];

/// Question vertical selecting authority allowlists and path keywords.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Vertical {
    /// No vertical-specific authorities.
    #[default]
    General,
    /// Banking, insurance and markets.
    Finance,
    /// Medicine and public health.
    Health,
    /// Software and standards.
    Technology,
}

impl Vertical {
    /// Lower-case vertical name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Finance => "finance",
            Self::Health => "health",
            Self::Technology => "technology",
        }
    }

    fn authorities(self) -> &'static [&'static str] {
        match self {
            Self::General => &[],
            Self::Finance => &[
                "banque-france.fr",
                "amf-france.org",
                "acpr.banque-france.fr",
                "cbanque.com",
                "moneyvox.fr",
                "boursorama.com",
            ],
            Self::Health => &[
                "who.int",
                "has-sante.fr",
                "ameli.fr",
                "inserm.fr",
                "vidal.fr",
                "mayoclinic.org",
            ],
            Self::Technology => &[
                "developer.mozilla.org",
                "w3.org",
                "ietf.org",
                "acm.org",
                "ieee.org",
                "arstechnica.com",
            ],
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::General => &[],
            Self::Finance => &["banque", "bank", "finance", "credit", "epargne", "assurance"],
            Self::Health => &["sante", "health", "medical", "maladie"],
            Self::Technology => &["docs", "developer", "reference", "spec"],
        }
    }
}

/// Keywords that count as relevant for every vertical.
const BASE_KEYWORDS: &[&str] = &["guide", "article", "blog", "ressource", "documentation"];

impl fmt::Display for Vertical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vertical {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "finance" => Ok(Self::Finance),
            "health" => Ok(Self::Health),
            "technology" | "tech" => Ok(Self::Technology),
            other => Err(format!(
                "unknown vertical '{other}' (expected general, finance, health or technology)"
            )),
        }
    }
}

/// Why a host was blocklisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Search engine host or any `/search` result page.
    SearchEngine,
    /// Social platform outside an official profile.
    SocialPlatform,
    /// URL shortener.
    Shortener,
}

/// Immutable blocklists and authority tables for one run.
#[derive(Debug, Clone)]
pub struct SourcePolicy {
    vertical: Vertical,
    search_engines: Vec<String>,
    social_platforms: Vec<String>,
    shorteners: Vec<String>,
    official_markers: Vec<String>,
    keywords: Vec<String>,
    institutional: Vec<String>,
    press: Vec<String>,
    vertical_authorities: Vec<String>,
    generic_tlds: Vec<String>,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

fn normalize_entries<I, S>(entries: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
}

fn extend_unique(target: &mut Vec<String>, entries: impl Iterator<Item = String>) {
    for entry in entries {
        if !target.contains(&entry) {
            target.push(entry);
        }
    }
}

impl Default for SourcePolicy {
    fn default() -> Self {
        Self::for_vertical(Vertical::General)
    }
}

impl SourcePolicy {
    /// Built-in tables for `vertical`.
    #[must_use]
    pub fn for_vertical(vertical: Vertical) -> Self {
        let mut keywords = owned(BASE_KEYWORDS);
        extend_unique(&mut keywords, normalize_entries(vertical.keywords()));

        let mut institutional = owned(INSTITUTIONAL_SUFFIXES);
        institutional.extend(owned(ACADEMIC_INDEXES));

        Self {
            vertical,
            search_engines: owned(SEARCH_ENGINES),
            social_platforms: owned(SOCIAL_PLATFORMS),
            shorteners: owned(URL_SHORTENERS),
            official_markers: owned(OFFICIAL_PROFILE_MARKERS),
            keywords,
            institutional,
            press: owned(PRESS),
            vertical_authorities: owned(vertical.authorities()),
            generic_tlds: owned(GENERIC_TLDS),
        }
    }

    /// Adds path keywords to the preset list.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        extend_unique(&mut self.keywords, normalize_entries(keywords));
        self
    }

    /// Adds domains to the vertical authority allowlist.
    #[must_use]
    pub fn with_vertical_authorities<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        extend_unique(&mut self.vertical_authorities, normalize_entries(domains));
        self
    }

    /// Adds domains to the press allowlist.
    #[must_use]
    pub fn with_press<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        extend_unique(&mut self.press, normalize_entries(domains));
        self
    }

    /// Adds domains to the institutional allowlist.
    #[must_use]
    pub fn with_institutional<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        extend_unique(&mut self.institutional, normalize_entries(domains));
        self
    }

    /// Vertical the policy was built for.
    #[must_use]
    pub fn vertical(&self) -> Vertical {
        self.vertical
    }

    /// Path keywords earning the keyword bonus.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Whether `path` contains a configured keyword (case-insensitive).
    #[must_use]
    pub fn path_has_keyword(&self, path: &str) -> bool {
        let path = path.to_lowercase();
        self.keywords.iter().any(|keyword| path.contains(keyword.as_str()))
    }

    /// Whether a query parameter is a tracking parameter.
    #[must_use]
    pub fn is_tracking_param(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        TRACKING_PARAMS.contains(&name.as_str())
            || TRACKING_PARAM_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
    }

    /// Blocklist verdict for a lower-cased `host` and `path`.
    #[must_use]
    pub fn block_reason(&self, host: &str, path: &str) -> Option<BlockKind> {
        let bare = host.strip_prefix("www.").unwrap_or(host);
        if self.search_engines.iter().any(|engine| engine == bare) || is_search_path(path) {
            return Some(BlockKind::SearchEngine);
        }
        if self.shorteners.iter().any(|s| domain_matches(host, s)) {
            return Some(BlockKind::Shortener);
        }
        if self.social_platforms.iter().any(|s| domain_matches(host, s)) {
            let path = path.to_ascii_lowercase();
            let official = self
                .official_markers
                .iter()
                .any(|marker| path.contains(marker.as_str()));
            if !official {
                return Some(BlockKind::SocialPlatform);
            }
        }
        None
    }

    /// Authority rules as `(domain pattern, tier)` pairs.
    pub fn authority_rules(&self) -> impl Iterator<Item = (&str, ReliabilityTier)> + '_ {
        tagged(&self.institutional, ReliabilityTier::Institutional)
            .chain(tagged(&self.press, ReliabilityTier::Press))
            .chain(tagged(&self.vertical_authorities, ReliabilityTier::VerticalAuthority))
            .chain(tagged(&self.generic_tlds, ReliabilityTier::Generic))
    }
}

fn tagged(list: &[String], tier: ReliabilityTier) -> impl Iterator<Item = (&str, ReliabilityTier)> + '_ {
    list.iter().map(move |d| (d.as_str(), tier))
}

/// Result pages: a first path segment of `search`.
fn is_search_path(path: &str) -> bool {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .is_some_and(|first| first.eq_ignore_ascii_case("search"))
}
