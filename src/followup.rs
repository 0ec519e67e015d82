//! Follow-up round control.
//!
//! The controller starts in [`FollowUpState::InitialRound`] and can move to
//! [`FollowUpState::FollowUpRound`] exactly once. There is no third round.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::provider::ProviderId;

/// Round-budget state of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpState {
    /// The initial fan-out is (or was) the only round.
    InitialRound,
    /// The follow-up round was granted; terminal.
    FollowUpRound,
}

/// Follow-up instruction for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowUpRequest {
    /// Provider to query again.
    pub provider: ProviderId,
    /// Distinct sources already harvested from it.
    pub already_harvested: usize,
    /// Additional sources to ask for (at least 1).
    pub requested: usize,
}

/// Decides whether and how to run the follow-up round.
#[derive(Debug, Clone)]
pub struct FollowUpController {
    state: FollowUpState,
    enabled: bool,
    min_total: usize,
    per_provider_target: usize,
}

impl FollowUpController {
    /// Creates a controller for a run needing `min_total` sources, asking each
    /// provider for up to `per_provider_target`.
    #[must_use]
    pub fn new(min_total: usize, per_provider_target: usize) -> Self {
        Self {
            state: FollowUpState::InitialRound,
            enabled: true,
            min_total,
            per_provider_target,
        }
    }

    /// Enables or disables the follow-up round altogether.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> FollowUpState {
        self.state
    }

    /// Whether the transition condition holds for the given yield.
    #[must_use]
    pub fn should_follow_up(&self, merged_count: usize, succeeded_providers: usize) -> bool {
        self.enabled
            && self.state == FollowUpState::InitialRound
            && merged_count < self.min_total
            && succeeded_providers >= 1
    }

    /// Evaluates the initial round and, when warranted, transitions and
    /// returns the follow-up plan.
    ///
    /// `harvested` maps every provider that succeeded in the initial round to
    /// the number of distinct sources it contributed. Returns `None` when no
    /// follow-up round is warranted or one was already granted.
    pub fn advance(
        &mut self,
        merged_count: usize,
        harvested: &BTreeMap<ProviderId, usize>,
    ) -> Option<Vec<FollowUpRequest>> {
        if !self.should_follow_up(merged_count, harvested.len()) {
            debug!(
                merged_count,
                min_total = self.min_total,
                succeeded = harvested.len(),
                state = ?self.state,
                "no follow-up round"
            );
            return None;
        }

        self.state = FollowUpState::FollowUpRound;
        let plan: Vec<FollowUpRequest> = harvested
            .iter()
            .filter(|&(_, &count)| count < self.per_provider_target)
            .map(|(provider, &count)| FollowUpRequest {
                provider: provider.clone(),
                already_harvested: count,
                requested: (self.per_provider_target - count).max(1),
            })
            .collect();

        info!(
            merged_count,
            min_total = self.min_total,
            planned = plan.len(),
            "yield below minimum; entering follow-up round"
        );
        Some(plan)
    }
}
