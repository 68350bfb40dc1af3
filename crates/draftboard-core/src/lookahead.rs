// Lookahead simulation: Value Over Next Available.
//
// A candidate's VONA is the points it outscores the best player at its
// position who is still on the board when the evaluating team picks again.
// Every estimate runs on a cloned branch of the draft; the caller's state
// and rosters are only read.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::debug;

use crate::draft::roster::TeamRoster;
use crate::draft::schedule::PickSchedule;
use crate::draft::state::DraftState;
use crate::error::LookaheadError;
use crate::player::PlayerId;
use crate::policy::CpuPolicy;
use crate::valuation::vorp::ValuationEngine;

/// How a VONA estimate was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VonaOutcome {
    Positive,
    /// Someone at least as good is expected to be there later.
    ClampedNegative,
    /// Nobody at the candidate's position survives the lookahead.
    PositionExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VonaEstimate {
    /// User-facing value, never negative.
    pub value: f64,
    /// Candidate points minus best survivor points; zero when exhausted.
    pub raw: f64,
    pub outcome: VonaOutcome,
}

impl VonaEstimate {
    fn from_raw(raw: Option<f64>) -> Self {
        match raw {
            None => VonaEstimate {
                value: 0.0,
                raw: 0.0,
                outcome: VonaOutcome::PositionExhausted,
            },
            Some(r) if r.is_finite() && r > 0.0 => VonaEstimate {
                value: r,
                raw: r,
                outcome: VonaOutcome::Positive,
            },
            Some(r) => VonaEstimate {
                value: 0.0,
                raw: r,
                outcome: VonaOutcome::ClampedNegative,
            },
        }
    }
}

/// Read-only collaborators a lookahead branch needs.
#[derive(Debug, Clone, Copy)]
pub struct Lookahead<'a> {
    pub schedule: &'a PickSchedule,
    pub engine: &'a ValuationEngine,
    pub policy: &'a CpuPolicy,
}

/// Picks other teams make between `current_pick` and `team`'s next turn.
/// Zero when the team has no later pick.
pub fn picks_until_next_turn(schedule: &PickSchedule, team: usize, current_pick: u32) -> u32 {
    schedule
        .next_pick_for_team(team, current_pick)
        .map(|next| next - current_pick - 1)
        .unwrap_or(0)
}

/// Available players ordered by ADP, missing ADP last, truncated to `n`.
pub fn shortlist_by_adp(state: &DraftState, n: usize) -> Vec<PlayerId> {
    let mut ids = state.available_ids();
    ids.sort_by(|&a, &b| {
        let adp_a = state.adp(a).unwrap_or(f64::INFINITY);
        let adp_b = state.adp(b).unwrap_or(f64::INFINITY);
        adp_a.total_cmp(&adp_b).then(a.cmp(&b))
    });
    ids.truncate(n);
    ids
}

/// Seed for one candidate's branch, stable for a given session seed, pick
/// and shortlist rank.
pub fn candidate_seed(base: u64, pick: u32, rank: usize) -> u64 {
    base ^ (u64::from(pick) << 32) ^ (rank as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

impl<'a> Lookahead<'a> {
    /// Estimate VONA for `candidate` if `evaluating_team` takes it now.
    ///
    /// The branch drafts the candidate at the state's current pick, then
    /// lets the CPU policy make `picks_to_simulate` more picks, refreshing
    /// VORP before each. It stops early when the branch's pool runs dry.
    pub fn compute_vona(
        &self,
        candidate: PlayerId,
        evaluating_team: usize,
        state: &DraftState,
        rosters: &[TeamRoster],
        picks_to_simulate: u32,
        rng: &mut SmallRng,
    ) -> Result<VonaEstimate, LookaheadError> {
        let mut branch = state.clone();
        let mut branch_rosters = rosters.to_vec();

        let position = branch.draft_id(candidate)?;
        if let Some(roster) = branch_rosters.get_mut(evaluating_team) {
            roster.assign(candidate, position);
        }

        for _ in 0..picks_to_simulate {
            if branch.is_complete() {
                debug!("lookahead: branch complete before user's next turn");
                break;
            }
            let pick = branch.current_pick();
            let Some(team) = self.schedule.team_on_clock(pick) else {
                break;
            };
            let Some(roster) = branch_rosters.get(team) else {
                break;
            };

            self.engine.refresh(&mut branch)?;
            let Some(choice) = self.policy.choose_pick(&branch, roster, rng) else {
                break;
            };
            let pos = branch.draft_id(choice)?;
            branch_rosters[team].assign(choice, pos);
        }

        let candidate_points = state.points(candidate);
        let best_remaining = branch
            .available_players()
            .filter(|p| p.position == position)
            .map(|p| branch.points(p.id))
            .max_by(|a, b| a.total_cmp(b));

        let estimate = VonaEstimate::from_raw(best_remaining.map(|best| candidate_points - best));
        debug!(
            "VONA {}: {:.1} ({:?}) after {} simulated picks",
            state.player(candidate).display_name,
            estimate.value,
            estimate.outcome,
            branch.current_pick() - state.current_pick() - 1
        );
        Ok(estimate)
    }

    /// Estimate VONA for each of `candidates`, each on its own branch with an
    /// rng derived from `seed`, the current pick, and the candidate's index.
    pub fn evaluate(
        &self,
        candidates: &[PlayerId],
        evaluating_team: usize,
        state: &DraftState,
        rosters: &[TeamRoster],
        seed: u64,
    ) -> Result<Vec<(PlayerId, VonaEstimate)>, LookaheadError> {
        let current = state.current_pick();
        let picks = picks_until_next_turn(self.schedule, evaluating_team, current);
        debug!(
            "evaluating VONA for {} candidates, simulating {} picks",
            candidates.len(),
            picks
        );

        candidates
            .iter()
            .enumerate()
            .map(|(rank, &id)| {
                let mut rng = SmallRng::seed_from_u64(candidate_seed(seed, current, rank));
                self.compute_vona(id, evaluating_team, state, rosters, picks, &mut rng)
                    .map(|estimate| (id, estimate))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
