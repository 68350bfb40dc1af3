// Pick policies: the probabilistic CPU opponent and the deterministic
// auto-pick used on the user's behalf.
//
// Both score players by a weighted blend of rank columns (lower is better)
// and then nudge the blend with roster-aware adjustments.

pub mod auto;
pub mod cpu;
pub mod sampler;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::draft::roster::TeamRoster;
use crate::draft::state::DraftState;
use crate::player::{PlayerId, PositionTable};
use crate::valuation::scarcity::scarcity_leader;

pub use auto::AutoPickPolicy;
pub use cpu::CpuPolicy;
pub use sampler::PickSampler;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Weights for the VORP rank and ADP rank columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub vorp: f64,
    pub adp: f64,
}

/// Which blend a CPU opponent uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyMode {
    /// Self-play opponents lean hard on ADP to draft like people do.
    Simulation,
    /// Lookahead for a live draft.
    Live,
}

/// Table-driven CPU opponent behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuPolicyConfig {
    pub simulation_weights: BlendWeights,
    pub live_weights: BlendWeights,
    /// Multiplier for players at a still-unfilled starting position.
    pub need_multiplier: f64,
    /// Multiplier for players at a position the team already holds `cap` of.
    pub saturation_multiplier: f64,
    pub position_caps: PositionTable<usize>,
    /// Subtracted from the scarcity leader's score.
    pub scarcity_bonus: f64,
    pub shortlist_size: usize,
    /// Selection weight by shortlist rank, best first.
    pub pick_probabilities: Vec<f64>,
    /// ADP assumed for players without one.
    pub missing_adp: f64,
}

impl Default for CpuPolicyConfig {
    fn default() -> Self {
        CpuPolicyConfig {
            simulation_weights: BlendWeights { vorp: 0.1, adp: 0.9 },
            live_weights: BlendWeights { vorp: 0.3, adp: 0.7 },
            need_multiplier: 0.85,
            saturation_multiplier: 3.0,
            position_caps: PositionTable {
                QB: 2,
                RB: 6,
                WR: 6,
                TE: 2,
                K: 1,
                DEF: 1,
            },
            scarcity_bonus: 10.0,
            shortlist_size: 10,
            pick_probabilities: vec![0.60, 0.20, 0.10, 0.05, 0.02, 0.01, 0.005, 0.005, 0.005, 0.005],
            missing_adp: 999.0,
        }
    }
}

/// Weights for the deterministic auto-pick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoPickConfig {
    pub vona_weight: f64,
    pub vorp_weight: f64,
    pub adp_weight: f64,
}

impl Default for AutoPickConfig {
    fn default() -> Self {
        AutoPickConfig {
            vona_weight: 0.5,
            vorp_weight: 0.2,
            adp_weight: 0.3,
        }
    }
}

// ---------------------------------------------------------------------------
// Ranking helpers
// ---------------------------------------------------------------------------

/// 1-based ranks with ties sharing the mean of the ranks they span.
///
/// `descending` ranks the largest value first.
pub fn average_ranks(values: &[f64], descending: bool) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        let ord = values[a].total_cmp(&values[b]);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end hold ranks start+1..=end.
        let mean = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = mean;
        }
        start = end;
    }
    ranks
}

/// One available player with its adjusted blend score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPlayer {
    pub id: PlayerId,
    pub score: f64,
    pub adp: f64,
}

/// Ascending by score, then ADP, then pool order.
pub(crate) fn compare_scored(a: &ScoredPlayer, b: &ScoredPlayer) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then(a.adp.total_cmp(&b.adp))
        .then(a.id.cmp(&b.id))
}

/// Apply need, saturation and scarcity adjustments in place.
pub(crate) fn apply_roster_adjustments(
    scored: &mut [ScoredPlayer],
    state: &DraftState,
    roster: &TeamRoster,
    config: &CpuPolicyConfig,
) {
    let needs = roster.unfilled_positions();
    let pool = state.pool();
    let leader = scarcity_leader(state);

    for s in scored.iter_mut() {
        let position = pool.get(s.id).position;
        if roster.count_at_position(position, pool) >= config.position_caps.get(position) {
            s.score *= config.saturation_multiplier;
        }
        if needs.contains(&position) {
            s.score *= config.need_multiplier;
        }
        if leader == Some(s.id) {
            s.score -= config.scarcity_bonus;
        }
    }
}
