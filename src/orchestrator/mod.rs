//! End-to-end extraction run.
//!
//! The orchestrator fans a prompt out to every enabled provider, parses and
//! validates whatever comes back, merges across providers, optionally runs a
//! single follow-up round, and ranks the result. Provider failures are recorded
//! in the result; only configuration problems abort a run, and they do so
//! before any provider is contacted.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use harvester_core::{ExtractionOrchestrator, ResearchQuery, SourcePolicy, build_default_providers};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let providers = build_default_providers(|name| std::env::var(name).ok());
//! let query = ResearchQuery::builder("Which online banks have the lowest fees?")
//!     .providers(providers.iter().map(|p| p.id()))
//!     .build()?;
//! let orchestrator = ExtractionOrchestrator::new(providers, Arc::new(SourcePolicy::default()));
//! let result = orchestrator.run(&query).await?;
//! for source in &result.sources {
//!     println!("{:.2} {}", source.combined_score(), source.canonical_url);
//! }
//! # Ok(())
//! # }
//! ```

mod result;
mod round;

pub use result::{ExtractionAudit, ExtractionResult, FailureRecord};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::dedup;
use crate::followup::FollowUpController;
use crate::parser::parse_response;
use crate::policy::SourcePolicy;
use crate::prompt::{PromptBuilder, PromptKind};
use crate::provider::{Provider, ProviderId};
use crate::query::{ConfigError, ResearchQuery};
use crate::reachability::ReachabilityChecker;
use crate::source::{Round, ValidatedSource};
use crate::validate::UrlValidator;
use round::{Job, ProviderResponse, fan_out};

/// Default timeout for one provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(120);

/// Upper bound accepted for the per-call timeout.
pub const MAX_PROVIDER_TIMEOUT: Duration = Duration::from_secs(600);

/// Coordinates one extraction run across registered providers.
pub struct ExtractionOrchestrator {
    providers: BTreeMap<ProviderId, Arc<dyn Provider>>,
    validator: UrlValidator,
    timeout: Duration,
    follow_up: bool,
    verify: bool,
    structured: bool,
    reachability: Option<ReachabilityChecker>,
}

impl std::fmt::Debug for ExtractionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionOrchestrator")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .field("follow_up", &self.follow_up)
            .field("verify", &self.verify)
            .field("structured", &self.structured)
            .field("reachability", &self.reachability.is_some())
            .finish_non_exhaustive()
    }
}

impl ExtractionOrchestrator {
    /// Creates an orchestrator over `providers`, keyed by their identifiers.
    ///
    /// A later provider with the same identifier replaces an earlier one.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn Provider>>, policy: Arc<SourcePolicy>) -> Self {
        let providers = providers.into_iter().map(|p| (p.id(), p)).collect();
        Self {
            providers,
            validator: UrlValidator::new(policy),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            follow_up: true,
            verify: false,
            structured: false,
            reachability: None,
        }
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables the follow-up round.
    #[must_use]
    pub fn follow_up(mut self, enabled: bool) -> Self {
        self.follow_up = enabled;
        self
    }

    /// Enables the verification pass for responses without explicit citations.
    #[must_use]
    pub fn verify(mut self, enabled: bool) -> Self {
        self.verify = enabled;
        self
    }

    /// Uses the JSON-answer prompt for the initial round.
    #[must_use]
    pub fn structured(mut self, enabled: bool) -> Self {
        self.structured = enabled;
        self
    }

    /// Probes the final sources with `checker` before returning.
    #[must_use]
    pub fn reachability(mut self, checker: ReachabilityChecker) -> Self {
        self.reachability = Some(checker);
        self
    }

    /// Identifiers of the registered providers.
    pub fn registered(&self) -> impl Iterator<Item = &ProviderId> {
        self.providers.keys()
    }

    /// Runs one extraction for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the question is empty, no provider is
    /// enabled, an enabled provider has no registered adapter, or the timeout
    /// is out of range. No provider is called in that case. Provider failures
    /// never surface here; they are listed in [`ExtractionResult::failures`].
    #[instrument(skip(self, query), fields(providers = query.enabled_providers().len()))]
    pub async fn run(&self, query: &ResearchQuery) -> Result<ExtractionResult, ConfigError> {
        let targets = self.resolve(query)?;
        let kind = if self.structured {
            PromptKind::StructuredQuery
        } else {
            PromptKind::MainQuery
        };
        let prompt = PromptBuilder::build(&kind, query)?;
        let cap = query.max_sources_per_provider();

        info!(
            providers = targets.len(),
            max_per_provider = cap,
            min_total = query.min_total_sources(),
            "starting extraction run"
        );

        let mut run = RunState::default();
        let jobs = targets
            .iter()
            .map(|provider| Job {
                provider: Arc::clone(provider),
                prompt: prompt.clone(),
            })
            .collect();
        let uncited = run.absorb(
            fan_out(jobs, Round::Initial, self.timeout).await,
            &self.validator,
            cap,
        );

        if self.verify && !uncited.is_empty() {
            self.verification_pass(&mut run, uncited, query, cap).await?;
        }

        let mut merged = dedup::merge(std::mem::take(&mut run.sources));
        let mut rounds_executed = 1;

        let harvested: BTreeMap<ProviderId, usize> = run
            .succeeded
            .iter()
            .map(|p| (p.clone(), merged.iter().filter(|s| s.providers.contains(p)).count()))
            .collect();
        let mut controller = FollowUpController::new(query.min_total_sources(), cap).enabled(self.follow_up);

        if let Some(plan) = controller.advance(merged.len(), &harvested) {
            let mut jobs = Vec::with_capacity(plan.len());
            for request in &plan {
                let Some(provider) = self.providers.get(&request.provider) else {
                    continue;
                };
                let kind = PromptKind::FollowUpSources {
                    already_harvested: request.already_harvested,
                    target_minimum: cap,
                };
                debug!(
                    provider = %request.provider,
                    already_harvested = request.already_harvested,
                    requested = request.requested,
                    "planning follow-up"
                );
                jobs.push(Job {
                    provider: Arc::clone(provider),
                    prompt: PromptBuilder::build(&kind, query)?,
                });
            }

            if !jobs.is_empty() {
                rounds_executed = 2;
                run.sources = merged;
                run.absorb(fan_out(jobs, Round::FollowUp, self.timeout).await, &self.validator, cap);
                merged = dedup::merge(std::mem::take(&mut run.sources));
            }
        }

        merged.sort_by(result::rank_order);
        if let Some(checker) = &self.reachability {
            checker.check_all(&mut merged).await;
        }

        let result = run.finish(merged, targets.iter().map(|p| p.id()), rounds_executed, query);
        info!(
            sources = result.sources.len(),
            succeeded = result.succeeded_providers.len(),
            failures = result.failures.len(),
            rounds = result.rounds_executed,
            below_minimum = result.below_minimum,
            "extraction run complete"
        );
        Ok(result)
    }

    /// Checks configuration and returns the adapters for the enabled providers.
    fn resolve(&self, query: &ResearchQuery) -> Result<Vec<Arc<dyn Provider>>, ConfigError> {
        if query.question().trim().is_empty() {
            return Err(ConfigError::EmptyQuestion);
        }
        if self.timeout.is_zero() || self.timeout > MAX_PROVIDER_TIMEOUT {
            return Err(ConfigError::invalid(
                "timeout",
                format!("{}s", self.timeout.as_secs_f64()),
                "1s to 600s",
            ));
        }
        if query.enabled_providers().is_empty() {
            return Err(ConfigError::no_providers());
        }

        query
            .enabled_providers()
            .iter()
            .map(|id| {
                self.providers
                    .get(id)
                    .map(Arc::clone)
                    .ok_or_else(|| ConfigError::provider_not_registered(id.as_str()))
            })
            .collect()
    }

    /// Asks providers whose answer had no explicit citations to list their URLs.
    async fn verification_pass(
        &self,
        run: &mut RunState,
        uncited: Vec<(ProviderId, String)>,
        query: &ResearchQuery,
        cap: usize,
    ) -> Result<(), ConfigError> {
        let mut jobs = Vec::with_capacity(uncited.len());
        for (id, body) in uncited {
            let Some(provider) = self.providers.get(&id) else {
                continue;
            };
            let kind = PromptKind::SourceVerification { response_body: body };
            jobs.push(Job {
                provider: Arc::clone(provider),
                prompt: PromptBuilder::build(&kind, query)?,
            });
        }

        debug!(count = jobs.len(), "running verification pass");
        for response in fan_out(jobs, Round::Initial, self.timeout).await {
            match response.body {
                Ok(body) => {
                    run.absorb_body(&response.provider, Round::Initial, &body, &self.validator, cap);
                }
                Err(error) => warn!(
                    provider = %response.provider,
                    error = %error,
                    "verification request failed; keeping initial answer"
                ),
            }
        }
        Ok(())
    }
}

/// Single-writer accumulator for one run, folded after each round joins.
#[derive(Debug, Default)]
struct RunState {
    sources: Vec<ValidatedSource>,
    succeeded: BTreeSet<ProviderId>,
    failures: Vec<FailureRecord>,
    audit: ExtractionAudit,
    /// Canonical URLs kept so far per provider, across every round and pass.
    kept: BTreeMap<ProviderId, BTreeSet<String>>,
}

impl RunState {
    /// Folds one round of responses in and returns successful bodies that
    /// carried no explicit or structured citation.
    fn absorb(
        &mut self,
        responses: Vec<ProviderResponse>,
        validator: &UrlValidator,
        cap: usize,
    ) -> Vec<(ProviderId, String)> {
        let mut uncited = Vec::new();
        for response in responses {
            self.audit
                .response_time_ms
                .entry(response.provider.clone())
                .or_default()
                .insert(
                    response.round,
                    u64::try_from(response.elapsed.as_millis()).unwrap_or(u64::MAX),
                );
            match response.body {
                Ok(body) => {
                    debug!(
                        provider = %response.provider,
                        round = %response.round,
                        elapsed_ms = response.elapsed.as_millis(),
                        received_at = ?response.received_at,
                        body_len = body.len(),
                        "provider responded"
                    );
                    self.succeeded.insert(response.provider.clone());
                    let cited =
                        self.absorb_body(&response.provider, response.round, &body, validator, cap);
                    if !cited {
                        uncited.push((response.provider, body));
                    }
                }
                Err(error) => {
                    warn!(
                        provider = %response.provider,
                        round = %response.round,
                        kind = error.kind(),
                        error = %error,
                        "provider call failed; continuing with remaining providers"
                    );
                    self.failures.push(FailureRecord {
                        provider: response.provider,
                        round: response.round,
                        error,
                    });
                }
            }
        }
        uncited
    }

    /// Parses, validates and caps one body. Returns whether any candidate was cited.
    ///
    /// A body may only add URLs up to what is left of the provider's `cap`
    /// after earlier bodies; URLs the provider already holds are kept.
    fn absorb_body(
        &mut self,
        provider: &ProviderId,
        round: Round,
        body: &str,
        validator: &UrlValidator,
        cap: usize,
    ) -> bool {
        let candidates = parse_response(body, provider, round);
        let cited = candidates.iter().any(|c| c.strategy.is_cited());
        self.audit.harvested += candidates.len();

        let mut accepted = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            *self
                .audit
                .by_strategy
                .entry(candidate.strategy.as_str().to_string())
                .or_default() += 1;
            match validator.check(candidate) {
                Ok(source) => accepted.push(source),
                Err(rejection) => {
                    *self
                        .audit
                        .rejected_by_reason
                        .entry(rejection.as_str().to_string())
                        .or_default() += 1;
                }
            }
        }
        self.audit.validated += accepted.len();

        let mut distinct = dedup::merge(accepted);
        distinct.sort_by(|a, b| {
            b.seed
                .cmp(&a.seed)
                .then_with(|| a.canonical_url.cmp(&b.canonical_url))
        });
        let seen = self.kept.entry(provider.clone()).or_default();
        let before_cap = distinct.len();
        distinct.retain(|source| {
            if seen.contains(&source.canonical_url) {
                true
            } else if seen.len() < cap {
                seen.insert(source.canonical_url.clone());
                true
            } else {
                false
            }
        });
        if distinct.len() < before_cap {
            debug!(
                provider = %provider,
                %round,
                kept = distinct.len(),
                dropped = before_cap - distinct.len(),
                "capping response to remaining per-provider budget"
            );
        }

        debug!(
            provider = %provider,
            %round,
            candidates = candidates.len(),
            kept = distinct.len(),
            cited,
            "response parsed"
        );
        self.sources.extend(distinct);
        cited
    }

    fn finish(
        mut self,
        sources: Vec<ValidatedSource>,
        enabled: impl Iterator<Item = ProviderId>,
        rounds_executed: u8,
        query: &ResearchQuery,
    ) -> ExtractionResult {
        let enabled: Vec<ProviderId> = enabled.collect();
        let per_provider_counts = result::count_per_provider(&sources, &enabled);

        for source in &sources {
            *self
                .audit
                .tier_distribution
                .entry(source.tier().as_str().to_string())
                .or_default() += 1;
        }
        self.audit.unique_domains = sources.iter().map(|s| s.domain.as_str()).collect::<BTreeSet<_>>().len();
        if sources.iter().any(|s| s.reachable.is_some()) {
            let reachable = sources.iter().filter(|s| s.reachable == Some(true)).count();
            self.audit.reachable = Some(reachable);
            self.audit.unreachable = Some(sources.len() - reachable);
        }

        ExtractionResult {
            below_minimum: sources.len() < query.min_total_sources(),
            sources,
            succeeded_providers: self.succeeded,
            failures: self.failures,
            rounds_executed,
            per_provider_counts,
            audit: self.audit,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::provider::ProviderError;

    struct Echo(&'static str, String);

    #[async_trait]
    impl Provider for Echo {
        fn id(&self) -> ProviderId {
            ProviderId::from(self.0)
        }

        async fn send(&self, _prompt: &str, _timeout: Duration) -> Result<String, ProviderError> {
            Ok(self.1.clone())
        }
    }

    fn orchestrator(providers: Vec<Arc<dyn Provider>>) -> ExtractionOrchestrator {
        ExtractionOrchestrator::new(providers, Arc::new(SourcePolicy::default()))
    }

    #[tokio::test]
    async fn test_unregistered_provider_is_fatal() {
        let orchestrator = orchestrator(vec![Arc::new(Echo("openai", String::new()))]);
        let query = ResearchQuery::builder("question").provider("gemini").build().unwrap();
        let err = orchestrator.run(&query).await.unwrap_err();
        assert!(matches!(err, ConfigError::ProviderNotRegistered { provider, .. } if provider == "gemini"));
    }

    #[tokio::test]
    async fn test_zero_timeout_is_fatal() {
        let orchestrator = orchestrator(vec![Arc::new(Echo("openai", String::new()))]).timeout(Duration::ZERO);
        let query = ResearchQuery::builder("question").provider("openai").build().unwrap();
        assert!(matches!(
            orchestrator.run(&query).await.unwrap_err(),
            ConfigError::InvalidSetting { field: "timeout", .. }
        ));
    }

    #[tokio::test]
    async fn test_response_is_capped_to_max_per_provider() {
        let body: String = (0..8)
            .map(|i| format!("Source: [Site {i}] - URL: https://site{i}.example.org/page/{i}\n"))
            .collect();
        let orchestrator = orchestrator(vec![Arc::new(Echo("openai", body))]).follow_up(false);
        let query = ResearchQuery::builder("question")
            .provider("openai")
            .max_sources_per_provider(3)
            .build()
            .unwrap();
        let result = orchestrator.run(&query).await.unwrap();
        assert_eq!(result.sources.len(), 3);
        assert_eq!(result.audit.harvested, 8);
        assert_eq!(result.audit.validated, 8);
        assert!(result.below_minimum);
    }

    #[tokio::test]
    async fn test_audit_counts_rejections() {
        let body = "See https://www.google.com/search?q=banks and https://example.org/guide/banks".to_string();
        let orchestrator = orchestrator(vec![Arc::new(Echo("openai", body))]).follow_up(false);
        let query = ResearchQuery::builder("question").provider("openai").build().unwrap();
        let result = orchestrator.run(&query).await.unwrap();
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.audit.rejected_by_reason["blocklisted"], 1);
        assert_eq!(result.audit.by_strategy["bare_url"], 2);
        assert_eq!(result.audit.unique_domains, 1);
        assert_eq!(result.audit.reachable, None);
    }
}
