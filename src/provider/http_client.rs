//! Shared HTTP client construction and response mapping for provider adapters.
//!
//! All adapters go through the same builder so user agent, compression,
//! connect timeout and proxy handling stay consistent, and through the same
//! status mapping so a 429 from any vendor becomes the same
//! [`ProviderError::RateLimited`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, SystemTime};

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, Proxy, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::user_agent;

use super::ProviderError;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Longest Retry-After delay reported back to callers (1 hour).
const MAX_RETRY_AFTER_SECS: u64 = 3600;

/// Builds a provider HTTP client using shared project policy.
///
/// `provider` is only used for error messages and logging.
///
/// # Errors
///
/// Returns [`ProviderError::Unreachable`] when client construction fails.
pub(crate) fn build_provider_http_client(provider: &str) -> Result<Client, ProviderError> {
    build_http_client(provider, &user_agent::default_provider_user_agent())
        .map_err(|reason| ProviderError::unreachable(provider, reason))
}

/// Builds an HTTP client with the shared construction policy.
///
/// `label` only appears in logs. The error is a human-readable reason.
pub(crate) fn build_http_client(label: &str, user_agent: &str) -> Result<Client, String> {
    match try_build_client(user_agent, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Sandboxed environments can panic while reading system proxy
            // settings; retry with env-only proxy discovery.
            warn!(
                client = label,
                "HTTP client hit system proxy panic; using env-proxy fallback builder"
            );
            match try_build_client(user_agent, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => {
                    Err("HTTP client construction panicked while initializing networking".to_string())
                }
                Err(BuildClientFailure::Build(error)) => {
                    Err(format!("HTTP client construction failed: {error}"))
                }
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(format!("HTTP client construction failed: {error}")),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    user_agent: &str,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let user_agent = user_agent.to_string();
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(user_agent);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(user_agent: String) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .user_agent(user_agent)
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

/// Sends `request` under `timeout` and decodes a JSON success body into `T`.
///
/// # Errors
///
/// Returns the mapped [`ProviderError`] for transport failures, non-success
/// statuses, and bodies that do not match `T`.
pub(crate) async fn execute_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
    timeout: Duration,
) -> Result<T, ProviderError> {
    let response = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| map_transport_error(provider, &e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        let error = map_error_status(provider, status, response.headers());
        debug!(provider, status = status.as_u16(), error = %error, "Provider API error");
        return Err(error);
    }

    let body = response
        .text()
        .await
        .map_err(|e| map_transport_error(provider, &e, timeout))?;
    serde_json::from_str(&body)
        .map_err(|e| ProviderError::malformed(provider, format!("unexpected response shape: {e}")))
}

/// Maps a non-success HTTP status to the matching [`ProviderError`].
pub(crate) fn map_error_status(
    provider: &str,
    status: StatusCode,
    headers: &HeaderMap,
) -> ProviderError {
    match status.as_u16() {
        code @ (401 | 403) => ProviderError::AuthenticationFailed {
            provider: provider.to_string(),
            status: code,
        },
        429 => {
            let retry_after_secs = headers
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_retry_after);
            ProviderError::RateLimited {
                provider: provider.to_string(),
                retry_after_secs,
            }
        }
        code if code >= 500 => {
            ProviderError::unreachable(provider, format!("provider API unavailable (HTTP {code})"))
        }
        code => ProviderError::unreachable(provider, format!("provider API returned HTTP {code}")),
    }
}

/// Maps a transport-level reqwest failure.
pub(crate) fn map_transport_error(
    provider: &str,
    error: &reqwest::Error,
    timeout: Duration,
) -> ProviderError {
    if error.is_timeout() {
        debug!(provider, "Provider request timed out");
        ProviderError::timeout(provider, timeout)
    } else if error.is_decode() {
        ProviderError::malformed(provider, format!("response body could not be decoded: {error}"))
    } else if error.is_connect() {
        ProviderError::unreachable(provider, "cannot connect to provider API. Check your network connection.")
    } else {
        ProviderError::unreachable(provider, error.to_string())
    }
}

/// Parses a Retry-After header value into whole seconds.
///
/// Accepts delta-seconds and HTTP-dates. Values above one hour are capped;
/// negative values and dates in the past yield `None`.
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<u64> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        if seconds < 0 {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        }
        let seconds = u64::try_from(seconds).ok()?;
        return Some(seconds.min(MAX_RETRY_AFTER_SECS));
    }

    if let Ok(datetime) = httpdate::parse_http_date(header_value) {
        return match datetime.duration_since(SystemTime::now()) {
            Ok(delay) => Some(delay.as_secs().min(MAX_RETRY_AFTER_SECS)),
            Err(_) => {
                debug!(header = header_value, "Retry-After date is in the past, ignoring");
                None
            }
        };
    }

    debug!(header = header_value, "unparseable Retry-After value");
    None
}
