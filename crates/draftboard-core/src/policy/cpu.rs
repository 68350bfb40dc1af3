// CPU opponent pick policy.

use rand::rngs::SmallRng;
use tracing::debug;

use super::{
    apply_roster_adjustments, average_ranks, compare_scored, BlendWeights, CpuPolicyConfig,
    PickSampler, PolicyMode, ScoredPlayer,
};
use crate::draft::roster::TeamRoster;
use crate::draft::state::DraftState;
use crate::player::PlayerId;

/// Scores available players on a VORP/ADP rank blend, adjusts for the
/// team's roster, and samples one of the best few.
#[derive(Debug, Clone)]
pub struct CpuPolicy {
    config: CpuPolicyConfig,
    weights: BlendWeights,
    sampler: PickSampler,
}

impl CpuPolicy {
    pub fn new(config: CpuPolicyConfig, mode: PolicyMode) -> Self {
        let weights = match mode {
            PolicyMode::Simulation => config.simulation_weights,
            PolicyMode::Live => config.live_weights,
        };
        let sampler = PickSampler::new(config.pick_probabilities.clone());
        CpuPolicy {
            config,
            weights,
            sampler,
        }
    }

    pub fn config(&self) -> &CpuPolicyConfig {
        &self.config
    }

    /// Every available player with its adjusted score, best first.
    pub fn rank(&self, state: &DraftState, roster: &TeamRoster) -> Vec<ScoredPlayer> {
        let ids = state.available_ids();
        if ids.is_empty() {
            return Vec::new();
        }

        let vorps: Vec<f64> = ids.iter().map(|&id| state.vorp(id)).collect();
        let adps: Vec<f64> = ids
            .iter()
            .map(|&id| state.adp(id).unwrap_or(self.config.missing_adp))
            .collect();
        let vorp_ranks = average_ranks(&vorps, true);
        let adp_ranks = average_ranks(&adps, false);

        let mut scored: Vec<ScoredPlayer> = ids
            .iter()
            .enumerate()
            .map(|(i, &id)| ScoredPlayer {
                id,
                score: self.weights.vorp * vorp_ranks[i] + self.weights.adp * adp_ranks[i],
                adp: adps[i],
            })
            .collect();

        apply_roster_adjustments(&mut scored, state, roster, &self.config);
        scored.sort_by(compare_scored);
        scored
    }

    /// The shortlist a pick is sampled from.
    pub fn shortlist(&self, state: &DraftState, roster: &TeamRoster) -> Vec<ScoredPlayer> {
        let mut ranked = self.rank(state, roster);
        ranked.truncate(self.config.shortlist_size.max(1));
        ranked
    }

    /// Choose a pick for `roster`'s team. `None` means nobody is left, which
    /// callers treat as the end of the draft.
    pub fn choose_pick(
        &self,
        state: &DraftState,
        roster: &TeamRoster,
        rng: &mut SmallRng,
    ) -> Option<PlayerId> {
        let shortlist = self.shortlist(state, roster);
        let index = self.sampler.sample(shortlist.len(), rng)?;
        let choice = shortlist[index];
        debug!(
            "CPU pick {}: {} (shortlist rank {}, score {:.2})",
            state.current_pick(),
            state.player(choice.id).display_name,
            index + 1,
            choice.score
        );
        Some(choice.id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
