//! One fan-out-and-collect cycle.
//!
//! Every job runs in its own task under an independent timeout. The caller
//! gets one [`ProviderResponse`] per job after all tasks have finished.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, warn};

use crate::provider::{Provider, ProviderError, ProviderId};
use crate::source::Round;

/// Raw outcome of one provider call. Discarded after parsing.
#[derive(Debug)]
pub(crate) struct ProviderResponse {
    pub(crate) provider: ProviderId,
    pub(crate) round: Round,
    pub(crate) body: Result<String, ProviderError>,
    pub(crate) received_at: SystemTime,
    pub(crate) elapsed: Duration,
}

/// A prompt addressed to one provider.
pub(crate) struct Job {
    pub(crate) provider: Arc<dyn Provider>,
    pub(crate) prompt: String,
}

async fn call(provider: &dyn Provider, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
    match tokio::time::timeout(timeout, provider.send(prompt, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::timeout(provider.id().as_str(), timeout)),
    }
}

/// Sends every job concurrently and waits for all of them.
pub(crate) async fn fan_out(jobs: Vec<Job>, round: Round, timeout: Duration) -> Vec<ProviderResponse> {
    let started = Instant::now();
    let mut handles = Vec::with_capacity(jobs.len());

    for job in jobs {
        let id = job.provider.id();
        debug!(provider = %id, %round, prompt_len = job.prompt.len(), "sending prompt");
        handles.push((
            id,
            tokio::spawn(async move {
                let sent = Instant::now();
                let body = call(job.provider.as_ref(), &job.prompt, timeout).await;
                (body, sent.elapsed())
            }),
        ));
    }

    let mut responses = Vec::with_capacity(handles.len());
    for (provider, handle) in handles {
        let (body, elapsed) = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(provider = %provider, %round, error = %e, "provider task panicked");
                (
                    Err(ProviderError::unreachable(
                        provider.as_str(),
                        format!("provider task failed: {e}"),
                    )),
                    started.elapsed(),
                )
            }
        };
        responses.push(ProviderResponse {
            provider,
            round,
            body,
            received_at: SystemTime::now(),
            elapsed,
        });
    }
    responses
}
