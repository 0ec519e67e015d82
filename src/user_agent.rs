//! Shared User-Agent strings for provider and reachability HTTP clients.
//!
//! Single source for project URL and UA format so provider traffic and
//! reachability probes stay consistent and easy to update.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/nicksrandall/harvester";

/// Default User-Agent for LLM provider API requests.
#[must_use]
pub(crate) fn default_provider_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("harvester/{version} (source-harvester; +{PROJECT_UA_URL})")
}

/// Default User-Agent for reachability probes against harvested source URLs.
#[must_use]
pub(crate) fn default_probe_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("harvester/{version} (reachability-check; +{PROJECT_UA_URL})")
}
