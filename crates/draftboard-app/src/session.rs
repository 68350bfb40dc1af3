// One draft session: the draft state, every team's roster, and the turn
// logic for simulated and live-assistant play.
//
// A `Session` is always reached through the manager's per-session mutex, so
// the methods here assume exclusive access and never block.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use draftboard_core::draft::{DraftState, PickSchedule, TeamRoster};
use draftboard_core::lookahead::{candidate_seed, picks_until_next_turn, shortlist_by_adp, Lookahead, VonaEstimate};
use draftboard_core::policy::{AutoPickPolicy, CpuPolicy};
use draftboard_core::valuation::ValuationEngine;
use draftboard_core::{DraftError, PlayerId, Position};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::live::LivePick;
use crate::protocol::{
    CpuPickResult, DraftStatusView, LivePickView, PlayerView, PollResult, PositionFilter,
    RosterSlotView, SessionMode, SortKey, StateView, UserPickResult, VonaMap,
};

/// Bookkeeping for a session mirroring a live draft room.
#[derive(Debug, Clone)]
pub struct LiveLink {
    pub draft_id: String,
    /// Platform roster id to team index.
    pub roster_to_team: HashMap<String, usize>,
    pub user_roster_id: String,
    /// Highest live pick number already applied.
    pub applied_through: u32,
}

#[derive(Debug, Clone)]
pub enum SessionKind {
    Simulated,
    Live(LiveLink),
}

/// VONA estimates for the shortlist at one pick.
#[derive(Debug, Clone)]
struct VonaCache {
    pick: u32,
    estimates: HashMap<PlayerId, VonaEstimate>,
}

/// Everything `Session::new` needs, already resolved by the manager.
pub struct SessionParts {
    pub id: String,
    pub kind: SessionKind,
    pub state: DraftState,
    pub schedule: PickSchedule,
    pub engine: ValuationEngine,
    pub cpu: CpuPolicy,
    pub auto: AutoPickPolicy,
    /// 0-based team index of the user.
    pub user_team: usize,
    pub non_interactive: bool,
    pub vona_shortlist: usize,
    pub seed: u64,
}

pub struct Session {
    pub id: String,
    pub kind: SessionKind,
    pub state: DraftState,
    pub rosters: Vec<TeamRoster>,
    pub schedule: PickSchedule,
    engine: ValuationEngine,
    cpu: CpuPolicy,
    auto: AutoPickPolicy,
    pub user_team: usize,
    pub non_interactive: bool,
    vona_shortlist: usize,
    vona: Option<VonaCache>,
    rng: SmallRng,
    lookahead_seed: u64,
    /// Last live-provider failure, cleared by the next successful poll.
    pub upstream_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    cancel: watch::Sender<bool>,
}

impl Session {
    /// Build a session and compute its initial board.
    pub fn new(parts: SessionParts) -> Result<Self, SessionError> {
        let mut rng = SmallRng::seed_from_u64(parts.seed);
        let lookahead_seed = rng.gen::<u64>();
        let rosters = vec![TeamRoster::new(&parts.engine.template); parts.schedule.team_count];
        let (cancel, _) = watch::channel(false);
        let now = Utc::now();

        let mut session = Session {
            id: parts.id,
            kind: parts.kind,
            state: parts.state,
            rosters,
            schedule: parts.schedule,
            engine: parts.engine,
            cpu: parts.cpu,
            auto: parts.auto,
            user_team: parts.user_team,
            non_interactive: parts.non_interactive,
            vona_shortlist: parts.vona_shortlist,
            vona: None,
            rng,
            lookahead_seed,
            upstream_error: None,
            created_at: now,
            last_active: now,
            cancel,
        };
        session.engine.refresh(&mut session.state)?;
        Ok(session)
    }

    pub fn mode(&self) -> SessionMode {
        match self.kind {
            SessionKind::Simulated => SessionMode::Simulated,
            SessionKind::Live(_) => SessionMode::Live,
        }
    }

    pub fn live_draft_id(&self) -> Option<&str> {
        match &self.kind {
            SessionKind::Live(link) => Some(&link.draft_id),
            SessionKind::Simulated => None,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_active = now;
    }

    pub fn subscribe_cancel(&self) -> watch::Receiver<bool> {
        self.cancel.subscribe()
    }

    /// Signal every wait loop attached to this session to stop.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Team index on the clock, or `None` once the draft is over.
    pub fn team_on_clock(&self) -> Option<usize> {
        if self.state.is_complete() {
            return None;
        }
        self.schedule.team_on_clock(self.state.current_pick())
    }

    pub fn is_user_turn(&self) -> bool {
        self.team_on_clock() == Some(self.user_team)
    }

    // -----------------------------------------------------------------------
    // VONA
    // -----------------------------------------------------------------------

    fn lookahead(&self) -> Lookahead<'_> {
        Lookahead {
            schedule: &self.schedule,
            engine: &self.engine,
            policy: &self.cpu,
        }
    }

    fn cached_vona(&self) -> Option<&HashMap<PlayerId, VonaEstimate>> {
        self.vona
            .as_ref()
            .filter(|c| c.pick == self.state.current_pick())
            .map(|c| &c.estimates)
    }

    /// Recompute VONA for the ADP shortlist when the user is on the clock
    /// and the cache is for an earlier pick.
    pub fn refresh_vona(&mut self) -> Result<(), SessionError> {
        if !self.is_user_turn() || self.cached_vona().is_some() {
            return Ok(());
        }
        let pick = self.state.current_pick();
        let shortlist = shortlist_by_adp(&self.state, self.vona_shortlist);
        let results = self.lookahead().evaluate(
            &shortlist,
            self.user_team,
            &self.state,
            &self.rosters,
            self.lookahead_seed,
        )?;
        debug!("session {}: VONA refreshed for {} players at pick {}", self.id, results.len(), pick);
        self.vona = Some(VonaCache {
            pick,
            estimates: results.into_iter().collect(),
        });
        Ok(())
    }

    /// VONA for named players from the user's perspective. Unknown or
    /// drafted names are skipped.
    pub fn calculate_vona(&self, names: &[String]) -> Result<VonaMap, SessionError> {
        let current = self.state.current_pick();
        let picks = picks_until_next_turn(&self.schedule, self.user_team, current);
        let cached = self.cached_vona();
        let lookahead = self.lookahead();

        let mut out = VonaMap::new();
        for (rank, name) in names.iter().enumerate() {
            let Some(id) = self.state.pool().find(name) else {
                warn!("VONA requested for unknown player '{}'", name);
                continue;
            };
            if self.state.is_drafted(id) {
                debug!("VONA requested for drafted player '{}', skipped", name);
                continue;
            }
            let estimate = match cached.and_then(|c| c.get(&id)) {
                Some(e) => *e,
                None => {
                    let seed = candidate_seed(self.lookahead_seed ^ 0x5EED, current, rank);
                    let mut rng = SmallRng::seed_from_u64(seed);
                    lookahead.compute_vona(id, self.user_team, &self.state, &self.rosters, picks, &mut rng)?
                }
            };
            out.insert(self.state.player(id).display_name.clone(), estimate.value);
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Picks
    // -----------------------------------------------------------------------

    /// Assign a drafted player to `team`'s roster, then revalue the board.
    fn after_pick(&mut self, team: Option<usize>, id: PlayerId, position: Position) -> Result<(), SessionError> {
        match team.and_then(|t| self.rosters.get_mut(t)) {
            Some(roster) => {
                roster.assign(id, position);
            }
            None => warn!(
                "session {}: no team for pick of {}, roster not updated",
                self.id,
                self.state.player(id).display_name
            ),
        }
        self.engine.refresh(&mut self.state)?;
        self.refresh_vona()
    }

    /// Record a pick by name for the team on the clock.
    pub fn apply_user_pick(&mut self, name: &str) -> Result<UserPickResult, SessionError> {
        let team = self.team_on_clock();
        let position = self.state.draft_player(name)?;
        let id = self
            .state
            .history()
            .last()
            .copied()
            .ok_or_else(|| DraftError::NotFound { name: name.to_string() })?;
        let player_name = self.state.player(id).display_name.clone();
        info!(
            "session {}: pick {} {} ({}) by team {}",
            self.id,
            self.state.current_pick() - 1,
            player_name,
            position,
            team.map_or(0, |t| t + 1)
        );
        self.after_pick(team, id, position)?;
        Ok(UserPickResult {
            player_name,
            position,
            new_pick_number: self.state.current_pick(),
        })
    }

    /// Let the engine make the pick for the team on the clock. On the user's
    /// own turn this uses the deterministic auto-pick and requires a
    /// non-interactive session.
    pub fn apply_cpu_pick(&mut self) -> Result<CpuPickResult, SessionError> {
        if matches!(self.kind, SessionKind::Live(_)) {
            return Err(SessionError::NotSimulated);
        }
        let Some(team) = self.team_on_clock() else {
            return Err(DraftError::DraftComplete.into());
        };

        let choice = if team == self.user_team {
            if !self.non_interactive {
                return Err(SessionError::InvalidRequest(
                    "the user is on the clock; submit a user pick".into(),
                ));
            }
            self.refresh_vona()?;
            let vona: HashMap<PlayerId, f64> = self
                .cached_vona()
                .map(|c| c.iter().map(|(id, e)| (*id, e.value)).collect())
                .unwrap_or_default();
            self.auto.choose_pick(&self.state, &self.rosters[team], &vona)
        } else {
            self.cpu.choose_pick(&self.state, &self.rosters[team], &mut self.rng)
        };
        let Some(id) = choice else {
            return Err(DraftError::DraftComplete.into());
        };

        let pick = self.state.current_pick();
        let position = self.state.draft_id(id)?;
        let player_name = self.state.player(id).display_name.clone();
        info!(
            "session {}: pick {} {} ({}) by team {}{}",
            self.id,
            pick,
            player_name,
            position,
            team + 1,
            if team == self.user_team { " [auto]" } else { "" }
        );
        self.after_pick(Some(team), id, position)?;
        Ok(CpuPickResult {
            player_name,
            position,
            team: team as u32 + 1,
            new_pick_number: self.state.current_pick(),
        })
    }

    /// Apply picks reported by the live room that are newer than the last
    /// one applied. Picks already in the drafted set are skipped, and the
    /// pick cursor follows the room's numbering.
    pub fn apply_live_picks(&mut self, picks: &[LivePick]) -> Result<PollResult, SessionError> {
        let SessionKind::Live(link) = &mut self.kind else {
            return Err(SessionError::NotLive);
        };

        let mut applied = Vec::new();
        let already_applied = link.applied_through;
        for pick in picks.iter().filter(|p| p.pick_no > already_applied) {
            let team = pick
                .roster_id
                .as_ref()
                .and_then(|r| link.roster_to_team.get(r).copied())
                .or_else(|| pick.draft_slot.and_then(|s| (s as usize).checked_sub(1)))
                .or_else(|| self.schedule.team_on_clock(pick.pick_no));

            let resolved = self.state.pool().find_external(&pick.player_id);
            match resolved {
                None => warn!(
                    "session {}: live pick {} has unknown player id {}, skipped",
                    self.id, pick.pick_no, pick.player_id
                ),
                Some(id) if self.state.is_drafted(id) => debug!(
                    "session {}: live pick {} ({}) already applied",
                    self.id,
                    pick.pick_no,
                    self.state.player(id).display_name
                ),
                Some(id) => match self.state.draft_id(id) {
                    Ok(position) => {
                        let player_name = self.state.player(id).display_name.clone();
                        match team.and_then(|t| self.rosters.get_mut(t)) {
                            Some(roster) => {
                                roster.assign(id, position);
                            }
                            None => warn!(
                                "session {}: live pick {} has no resolvable team",
                                self.id, pick.pick_no
                            ),
                        }
                        info!(
                            "session {}: live pick {} {} ({})",
                            self.id, pick.pick_no, player_name, position
                        );
                        applied.push(LivePickView {
                            pick_number: pick.pick_no,
                            player_name,
                            position,
                        });
                    }
                    Err(e) => warn!("session {}: live pick {} not applied: {}", self.id, pick.pick_no, e),
                },
            }

            link.applied_through = pick.pick_no;
            self.state.sync_current_pick(pick.pick_no.saturating_add(1));
        }

        if !applied.is_empty() {
            self.engine.refresh(&mut self.state)?;
            self.refresh_vona()?;
        }
        Ok(PollResult {
            new_picks: applied,
            new_pick_number: self.state.current_pick(),
        })
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn view(&self, filter: PositionFilter, sort: SortKey, limit: usize) -> StateView {
        let cached = self.cached_vona();
        let mut players: Vec<PlayerView> = self
            .state
            .available_players()
            .filter(|p| filter.matches(p.position))
            .map(|p| {
                let estimate = cached.and_then(|c| c.get(&p.id));
                PlayerView {
                    name: p.display_name.clone(),
                    position: p.position,
                    points: self.state.points(p.id),
                    vorp: self.state.vorp(p.id),
                    vona: estimate.map(|e| e.value),
                    vona_outcome: estimate.map(|e| e.outcome),
                    adp: self.state.adp(p.id),
                }
            })
            .collect();

        match sort {
            SortKey::Adp => players.sort_by(|a, b| {
                let a_adp = a.adp.unwrap_or(f64::INFINITY);
                let b_adp = b.adp.unwrap_or(f64::INFINITY);
                a_adp.total_cmp(&b_adp)
            }),
            SortKey::Vorp => players.sort_by(|a, b| b.vorp.total_cmp(&a.vorp)),
            SortKey::Vona => players.sort_by(|a, b| {
                let a_vona = a.vona.unwrap_or(f64::NEG_INFINITY);
                let b_vona = b.vona.unwrap_or(f64::NEG_INFINITY);
                b_vona.total_cmp(&a_vona)
            }),
            SortKey::Points => players.sort_by(|a, b| b.points.total_cmp(&a.points)),
        }
        players.truncate(limit);

        StateView {
            session_id: self.id.clone(),
            mode: self.mode(),
            pick_number: self.state.current_pick(),
            is_user_turn: self.is_user_turn(),
            on_clock_team: self.team_on_clock().map(|t| t as u32 + 1),
            available_players: players,
            drafted_count: self.state.drafted_count(),
            total_picks: self.state.total_picks(),
            status: if self.state.is_complete() {
                DraftStatusView::Completed
            } else {
                DraftStatusView::InProgress
            },
            user_roster_id: match &self.kind {
                SessionKind::Live(link) => Some(link.user_roster_id.clone()),
                SessionKind::Simulated => None,
            },
            upstream_error: self.upstream_error.clone(),
            created_at: self.created_at,
        }
    }

    /// The user's roster in slot order.
    pub fn user_roster(&self) -> Vec<RosterSlotView> {
        self.rosters
            .get(self.user_team)
            .map(|roster| {
                roster
                    .slots
                    .iter()
                    .map(|slot| RosterSlotView {
                        slot: slot.name.clone(),
                        player_name: slot.player.map(|id| self.state.player(id).display_name.clone()),
                        position: slot.player.map(|id| self.state.player(id).position),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
