// Deterministic auto-pick for the user's own team.

use std::collections::HashMap;

use super::{
    apply_roster_adjustments, average_ranks, compare_scored, AutoPickConfig, CpuPolicyConfig,
    ScoredPlayer,
};
use crate::draft::roster::TeamRoster;
use crate::draft::state::DraftState;
use crate::player::PlayerId;

/// Same shape as the CPU policy with a VONA rank column added, and no
/// sampling: identical inputs always produce the same pick.
#[derive(Debug, Clone)]
pub struct AutoPickPolicy {
    weights: AutoPickConfig,
    adjustments: CpuPolicyConfig,
}

impl AutoPickPolicy {
    pub fn new(weights: AutoPickConfig, adjustments: CpuPolicyConfig) -> Self {
        AutoPickPolicy {
            weights,
            adjustments,
        }
    }

    /// Every available player scored, best first. Players without a VONA
    /// estimate rank as zero VONA.
    pub fn rank(
        &self,
        state: &DraftState,
        roster: &TeamRoster,
        vona: &HashMap<PlayerId, f64>,
    ) -> Vec<ScoredPlayer> {
        let ids = state.available_ids();
        if ids.is_empty() {
            return Vec::new();
        }

        let vonas: Vec<f64> = ids
            .iter()
            .map(|id| vona.get(id).copied().unwrap_or(0.0))
            .collect();
        let vorps: Vec<f64> = ids.iter().map(|&id| state.vorp(id)).collect();
        let adps: Vec<f64> = ids
            .iter()
            .map(|&id| state.adp(id).unwrap_or(self.adjustments.missing_adp))
            .collect();

        let vona_ranks = average_ranks(&vonas, true);
        let vorp_ranks = average_ranks(&vorps, true);
        let adp_ranks = average_ranks(&adps, false);

        let mut scored: Vec<ScoredPlayer> = ids
            .iter()
            .enumerate()
            .map(|(i, &id)| ScoredPlayer {
                id,
                score: self.weights.vona_weight * vona_ranks[i]
                    + self.weights.vorp_weight * vorp_ranks[i]
                    + self.weights.adp_weight * adp_ranks[i],
                adp: adps[i],
            })
            .collect();

        apply_roster_adjustments(&mut scored, state, roster, &self.adjustments);
        scored.sort_by(compare_scored);
        scored
    }

    pub fn choose_pick(
        &self,
        state: &DraftState,
        roster: &TeamRoster,
        vona: &HashMap<PlayerId, f64>,
    ) -> Option<PlayerId> {
        self.rank(state, roster, vona).first().map(|s| s.id)
    }
}
