//! Optional boolean reachability check for final sources.
//!
//! Each URL gets one HEAD request; a status below 400 counts as reachable.
//! Probes run concurrently under a semaphore and are paced per domain. No page
//! content is fetched.

mod rate_limiter;

pub use rate_limiter::DomainRateLimiter;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::provider::http_client::build_http_client;
use crate::source::ValidatedSource;
use crate::user_agent;

/// Default number of probes in flight.
pub const DEFAULT_PROBE_CONCURRENCY: usize = 8;

/// Default minimum delay between probes to one domain.
pub const DEFAULT_PER_DOMAIN_DELAY: Duration = Duration::from_millis(250);

/// Default timeout for one probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors constructing a [`ReachabilityChecker`].
#[derive(Debug, Error)]
pub enum ReachabilityError {
    /// The probe HTTP client could not be built.
    #[error("cannot initialize reachability checks: {reason}\n  Suggestion: Check proxy environment variables or run without --check-reachability")]
    ClientInit {
        /// Why construction failed
        reason: String,
    },

    /// Concurrency must be at least 1.
    #[error("invalid probe concurrency {value}: must be at least 1")]
    InvalidConcurrency {
        /// The rejected value
        value: usize,
    },
}

/// HEAD-probes source URLs and records the outcome on each source.
#[derive(Debug, Clone)]
pub struct ReachabilityChecker {
    client: Client,
    semaphore: Arc<Semaphore>,
    limiter: Arc<DomainRateLimiter>,
    timeout: Duration,
}

impl ReachabilityChecker {
    /// Creates a checker with default concurrency, pacing and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ReachabilityError::ClientInit`] when the HTTP client cannot be built.
    pub fn new() -> Result<Self, ReachabilityError> {
        Self::with_settings(
            DEFAULT_PROBE_CONCURRENCY,
            DEFAULT_PER_DOMAIN_DELAY,
            DEFAULT_PROBE_TIMEOUT,
        )
    }

    /// Creates a checker with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`ReachabilityError`] for zero concurrency or client construction failure.
    #[instrument(level = "debug")]
    pub fn with_settings(
        concurrency: usize,
        per_domain_delay: Duration,
        timeout: Duration,
    ) -> Result<Self, ReachabilityError> {
        if concurrency == 0 {
            return Err(ReachabilityError::InvalidConcurrency { value: concurrency });
        }
        let client = build_http_client("reachability", &user_agent::default_probe_user_agent())
            .map_err(|reason| ReachabilityError::ClientInit { reason })?;

        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            limiter: Arc::new(DomainRateLimiter::new(per_domain_delay)),
            timeout,
        })
    }

    /// Probes one URL. Transport errors and timeouts count as unreachable.
    pub async fn probe(&self, url: &str) -> bool {
        probe_url(&self.client, url, self.timeout).await
    }

    /// Probes every source and stores the result in `reachable`.
    ///
    /// Sources whose probe task panicked keep `reachable = None`.
    #[instrument(skip(self, sources), fields(count = sources.len()))]
    pub async fn check_all(&self, sources: &mut [ValidatedSource]) {
        let mut handles = Vec::with_capacity(sources.len());

        for (index, source) in sources.iter().enumerate() {
            let client = self.client.clone();
            let semaphore = Arc::clone(&self.semaphore);
            let limiter = Arc::clone(&self.limiter);
            let url = source.canonical_url.clone();
            let domain = source.domain.clone();
            let timeout = self.timeout;

            handles.push(tokio::spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, None);
                };
                limiter.acquire(&domain).await;
                (index, Some(probe_url(&client, &url, timeout).await))
            }));
        }

        for handle in handles {
            match handle.await {
                Ok((index, outcome)) => {
                    if let Some(source) = sources.get_mut(index) {
                        source.reachable = outcome;
                    }
                }
                Err(e) => warn!(error = %e, "reachability probe task panicked"),
            }
        }

        let reachable = sources.iter().filter(|s| s.reachable == Some(true)).count();
        info!(
            checked = sources.len(),
            reachable,
            unreachable = sources.len() - reachable,
            "reachability check complete"
        );
    }
}

async fn probe_url(client: &Client, url: &str, timeout: Duration) -> bool {
    match client.head(url).timeout(timeout).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            debug!(url, status, "reachability probe");
            status < 400
        }
        Err(e) => {
            debug!(url, error = %e, "reachability probe failed");
            false
        }
    }
}
