//! Per-domain pacing for reachability probes.
//!
//! Probes to different domains run in parallel; consecutive probes to the same
//! domain wait for the configured minimum delay.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Per-domain minimum-delay limiter shared across probe tasks.
#[derive(Debug)]
pub struct DomainRateLimiter {
    delay: Duration,
    /// Arc values let the `DashMap` shard lock drop before awaiting the Mutex.
    domains: DashMap<String, Arc<Mutex<Option<Instant>>>>,
}

impl DomainRateLimiter {
    /// Creates a limiter enforcing `delay` between probes to one domain.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            domains: DashMap::new(),
        }
    }

    /// Minimum delay between probes to the same domain.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits until a probe to `domain` is allowed, then records it.
    ///
    /// The first probe to a domain proceeds immediately.
    #[instrument(skip(self))]
    pub async fn acquire(&self, domain: &str) {
        if self.delay.is_zero() {
            return;
        }

        let state = self
            .domains
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();

        let mut last_probe = state.lock().await;
        if let Some(last) = *last_probe {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                let wait = self.delay.saturating_sub(elapsed);
                debug!(domain, wait_ms = wait.as_millis(), "pacing reachability probe");
                tokio::time::sleep(wait).await;
            }
        }
        *last_probe = Some(Instant::now());
    }
}
