// Session store and the operations exposed to callers.
//
// Sessions live behind a map lock (held only for lookup, insert and
// removal) and their own mutex (held for the whole of one operation), so
// different sessions progress concurrently while one session's mutations
// are strictly serialized.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use draftboard_core::draft::{DraftOrder, DraftSettings, DraftState, PickOrderTable, PickSchedule};
use draftboard_core::policy::{AutoPickPolicy, CpuPolicy, PolicyMode};
use draftboard_core::pool::PlayerPoolProvider;
use draftboard_core::valuation::ValuationEngine;
use draftboard_core::ScoringFormat;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::SessionError;
use crate::live::LiveDraftProvider;
use crate::protocol::{
    CpuPickResult, PollResult, PositionFilter, RosterSlotView, SortKey, StartRequest,
    StartResponse, StateView, UserPickResult, VonaMap,
};
use crate::session::{LiveLink, Session, SessionKind, SessionParts};

/// Largest league a session accepts.
const MAX_TEAMS: usize = 32;
const MAX_ROUNDS: u32 = 50;

/// How `wait_for_user_turn` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    UserTurn,
    DraftComplete,
    /// The session was closed or evicted while waiting.
    Cancelled,
}

pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    pool: Arc<dyn PlayerPoolProvider>,
    live: Arc<dyn LiveDraftProvider>,
    config: Config,
}

impl SessionManager {
    pub fn new(
        config: Config,
        pool: Arc<dyn PlayerPoolProvider>,
        live: Arc<dyn LiveDraftProvider>,
    ) -> Self {
        SessionManager {
            sessions: RwLock::new(HashMap::new()),
            pool,
            live,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn session(&self, session_id: &str) -> Result<Arc<Mutex<Session>>, SessionError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))
    }

    // -----------------------------------------------------------------------
    // start
    // -----------------------------------------------------------------------

    /// Create a session. Simulated sessions take their shape from the request
    /// and the configured league; live sessions from the draft room.
    pub async fn start(&self, request: StartRequest) -> Result<StartResponse, SessionError> {
        let league = &self.config.league;
        let strategy = &self.config.strategy;

        let requested_format = request
            .format
            .as_deref()
            .map(str::parse::<ScoringFormat>)
            .transpose()?;
        let requested_order = request
            .order
            .as_deref()
            .map(str::parse::<DraftOrder>)
            .transpose()
            .map_err(SessionError::InvalidRequest)?;
        let pick_slot = if request.pick_slot == 0 {
            league.pick_slot
        } else {
            request.pick_slot
        };

        let (kind, settings, table) = match request.live_draft_id.as_deref() {
            Some(draft_id) => {
                let live = self.live.draft_settings(draft_id).await?;
                let order = requested_order.unwrap_or(live.order);
                let settings = DraftSettings {
                    format: requested_format
                        .or(live.format)
                        .unwrap_or(league.format),
                    team_count: live.team_count,
                    round_count: live.round_count,
                    order,
                };
                check_league_shape(&settings)?;
                let user_roster_id = live
                    .slot_to_roster_id
                    .get(&pick_slot)
                    .cloned()
                    .ok_or(SessionError::UnresolvedRoster { slot: pick_slot })?;
                debug!(
                    "live draft {}: user slot {} is roster {}",
                    draft_id, pick_slot, user_roster_id
                );
                let roster_to_team = live
                    .slot_to_roster_id
                    .iter()
                    .filter(|(slot, _)| **slot >= 1)
                    .map(|(slot, roster)| (roster.clone(), *slot as usize - 1))
                    .collect();
                let link = LiveLink {
                    draft_id: draft_id.to_string(),
                    roster_to_team,
                    user_roster_id,
                    applied_through: 0,
                };
                let table = PickOrderTable::build(order, live.team_count, live.round_count);
                (SessionKind::Live(link), settings, Some(table))
            }
            None => {
                let settings = DraftSettings {
                    format: requested_format.unwrap_or(league.format),
                    team_count: request.team_count.unwrap_or(league.teams),
                    round_count: request.round_count.unwrap_or(league.rounds),
                    order: requested_order.unwrap_or(league.order),
                };
                (SessionKind::Simulated, settings, None)
            }
        };

        check_league_shape(&settings)?;
        if pick_slot == 0 || pick_slot as usize > settings.team_count {
            return Err(SessionError::InvalidRequest(format!(
                "pick slot {} is outside 1..={}",
                pick_slot, settings.team_count
            )));
        }

        let pool = self.pool.load()?;
        let state = DraftState::new(pool, settings)?;
        let mut schedule = PickSchedule::new(settings.order, settings.team_count, settings.round_count);
        if let Some(table) = table {
            schedule = schedule.with_table(table);
        }
        let mode = match kind {
            SessionKind::Simulated => PolicyMode::Simulation,
            SessionKind::Live(_) => PolicyMode::Live,
        };

        let session_id = Uuid::new_v4().to_string();
        let mut session = Session::new(SessionParts {
            id: session_id.clone(),
            kind,
            state,
            schedule,
            engine: ValuationEngine::new(league.roster.clone(), settings.team_count)
                .with_adjustments(strategy.adjustments),
            cpu: CpuPolicy::new(strategy.cpu.clone(), mode),
            auto: AutoPickPolicy::new(strategy.auto_pick, strategy.cpu.clone()),
            user_team: pick_slot as usize - 1,
            non_interactive: request.non_interactive,
            vona_shortlist: strategy.vona.shortlist_size,
            seed: request.seed.unwrap_or_else(rand::random),
        })?;

        // Catch up with a room that is already underway.
        if let Some(draft_id) = session.live_draft_id().map(str::to_string) {
            match self.live.draft_picks(&draft_id).await {
                Ok(picks) => {
                    session.apply_live_picks(&picks)?;
                }
                Err(e) => {
                    warn!("session {}: initial live sync failed: {}", session_id, e);
                    session.upstream_error = Some(e.to_string());
                }
            }
        }
        session.refresh_vona()?;

        info!(
            "session {} started: {:?}, {} teams x {} rounds, {} {}, user slot {}",
            session_id,
            session.mode(),
            settings.team_count,
            settings.round_count,
            settings.format,
            settings.order,
            pick_slot
        );
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), Arc::new(Mutex::new(session)));
        Ok(StartResponse { session_id })
    }

    // -----------------------------------------------------------------------
    // Per-session operations
    // -----------------------------------------------------------------------

    /// Current state with the available-player list filtered, sorted and
    /// truncated. VONA is refreshed first when the user is on the clock.
    pub async fn get_state(
        &self,
        session_id: &str,
        position_filter: Option<&str>,
        sort_key: Option<&str>,
    ) -> Result<StateView, SessionError> {
        let session = self.session(session_id).await?;
        let filter = position_filter
            .map(str::parse::<PositionFilter>)
            .transpose()
            .map_err(SessionError::InvalidRequest)?
            .unwrap_or_default();
        let sort = sort_key.map(SortKey::parse_or_default).unwrap_or_default();

        let mut guard = session.lock().await;
        guard.touch(Utc::now());
        guard.refresh_vona()?;
        Ok(guard.view(filter, sort, self.config.strategy.session.display_limit))
    }

    pub async fn apply_user_pick(
        &self,
        session_id: &str,
        player_name: &str,
    ) -> Result<UserPickResult, SessionError> {
        let session = self.session(session_id).await?;
        let mut guard = session.lock().await;
        guard.touch(Utc::now());
        guard.apply_user_pick(player_name)
    }

    /// Let the engine pick for the team on the clock. Simulated sessions only.
    pub async fn apply_cpu_pick(&self, session_id: &str) -> Result<CpuPickResult, SessionError> {
        let session = self.session(session_id).await?;
        let mut guard = session.lock().await;
        guard.touch(Utc::now());
        guard.apply_cpu_pick()
    }

    /// Fetch the live room's picks and apply the new ones. A provider failure
    /// is recorded on the session and returned as `UpstreamUnavailable`.
    pub async fn poll_live(&self, session_id: &str) -> Result<PollResult, SessionError> {
        let session = self.session(session_id).await?;
        let mut guard = session.lock().await;
        guard.touch(Utc::now());
        let draft_id = guard
            .live_draft_id()
            .ok_or(SessionError::NotLive)?
            .to_string();

        match self.live.draft_picks(&draft_id).await {
            Ok(picks) => {
                guard.upstream_error = None;
                let result = guard.apply_live_picks(&picks)?;
                if !result.is_noop() {
                    debug!(
                        "session {}: {} new live picks, now at pick {}",
                        session_id,
                        result.new_picks.len(),
                        result.new_pick_number
                    );
                }
                Ok(result)
            }
            Err(e) => {
                warn!("session {}: live poll failed: {}", session_id, e);
                guard.upstream_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    pub async fn calculate_vona(
        &self,
        session_id: &str,
        player_names: &[String],
    ) -> Result<VonaMap, SessionError> {
        let session = self.session(session_id).await?;
        let mut guard = session.lock().await;
        guard.touch(Utc::now());
        guard.refresh_vona()?;
        guard.calculate_vona(player_names)
    }

    pub async fn user_roster(&self, session_id: &str) -> Result<Vec<RosterSlotView>, SessionError> {
        let session = self.session(session_id).await?;
        let guard = session.lock().await;
        Ok(guard.user_roster())
    }

    // -----------------------------------------------------------------------
    // Live wait loop
    // -----------------------------------------------------------------------

    /// Poll the live room every `session.poll_interval_secs` until the user
    /// is on the clock or the draft is complete. Upstream failures are
    /// retried on the same interval. Returns `Cancelled` promptly when the
    /// session is closed or evicted.
    pub async fn wait_for_user_turn(&self, session_id: &str) -> Result<WaitOutcome, SessionError> {
        let session = self.session(session_id).await?;
        let mut cancel = {
            let guard = session.lock().await;
            if guard.live_draft_id().is_none() {
                return Err(SessionError::NotLive);
            }
            guard.subscribe_cancel()
        };

        let period = Duration::from_secs(self.config.strategy.session.poll_interval_secs);
        let mut interval = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        info!("session {}: wait cancelled", session_id);
                        return Ok(WaitOutcome::Cancelled);
                    }
                    continue;
                }
            }
            if *cancel.borrow() {
                return Ok(WaitOutcome::Cancelled);
            }

            match self.poll_live(session_id).await {
                Ok(_) => {}
                Err(SessionError::UpstreamUnavailable(e)) => {
                    warn!("session {}: retrying in {:?}: {}", session_id, period, e);
                    continue;
                }
                Err(SessionError::SessionNotFound(_)) => return Ok(WaitOutcome::Cancelled),
                Err(e) => return Err(e),
            }

            let guard = session.lock().await;
            if guard.state.is_complete() {
                return Ok(WaitOutcome::DraftComplete);
            }
            if guard.is_user_turn() {
                return Ok(WaitOutcome::UserTurn);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Remove a session and stop its wait loops.
    pub async fn close(&self, session_id: &str) -> Result<(), SessionError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;
        session.lock().await.cancel();
        info!("session {} closed", session_id);
        Ok(())
    }

    /// Drop sessions idle for longer than the configured TTL. Sessions busy
    /// with an operation are kept. Returns how many were evicted.
    pub async fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let ttl = Duration::from_secs(self.config.strategy.session.idle_ttl_secs);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| match session.try_lock() {
            Ok(guard) => {
                let idle = (now - guard.last_active).to_std().unwrap_or_default();
                if idle > ttl {
                    info!("session {} evicted after {}s idle", id, idle.as_secs());
                    guard.cancel();
                    false
                } else {
                    true
                }
            }
            Err(_) => true,
        });
        before - sessions.len()
    }

    /// Run `evict_idle` every `session.reaper_interval_secs` until `shutdown`
    /// flips to true or its sender is dropped.
    pub fn spawn_reaper(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let period = Duration::from_secs(self.config.strategy.session.reaper_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let evicted = manager.evict_idle(Utc::now()).await;
                        if evicted > 0 {
                            info!("reaper evicted {} idle sessions", evicted);
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("session reaper stopping");
                            break;
                        }
                    }
                }
            }
        })
    }
}

fn check_league_shape(settings: &DraftSettings) -> Result<(), SessionError> {
    if !(1..=MAX_TEAMS).contains(&settings.team_count) {
        return Err(SessionError::InvalidRequest(format!(
            "team count {} is outside 1..={}",
            settings.team_count, MAX_TEAMS
        )));
    }
    if !(1..=MAX_ROUNDS).contains(&settings.round_count) {
        return Err(SessionError::InvalidRequest(format!(
            "round count {} is outside 1..={}",
            settings.round_count, MAX_ROUNDS
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataPaths, LeagueConfig, LiveConfig, SleeperConfig, StrategyConfig};
    use crate::live::{LiveDraftSettings, LiveError, LivePick};
    use async_trait::async_trait;
    use draftboard_core::player::{FormatValues, PlayerPool, PlayerRow};
    use draftboard_core::pool::StaticPoolProvider;
    use draftboard_core::{DraftError, Position};
    use std::sync::Mutex as StdMutex;

    /// Scripted draft room: settings are fixed, picks are whatever the test
    /// last pushed, and failures can be switched on.
    struct FakeRoom {
        settings: LiveDraftSettings,
        picks: StdMutex<Vec<LivePick>>,
        failing: StdMutex<bool>,
    }

    impl FakeRoom {
        fn new(teams: usize, rounds: u32) -> Self {
            FakeRoom {
                settings: LiveDraftSettings {
                    team_count: teams,
                    round_count: rounds,
                    format: Some(ScoringFormat::Standard),
                    order: DraftOrder::Snake,
                    slot_to_roster_id: (1..=teams as u32).map(|s| (s, format!("r{s}"))).collect(),
                },
                picks: StdMutex::new(Vec::new()),
                failing: StdMutex::new(false),
            }
        }

        fn push(&self, player_id: &str, slot: u32) {
            let mut picks = self.picks.lock().unwrap();
            let pick_no = picks.len() as u32 + 1;
            picks.push(LivePick {
                pick_no,
                player_id: player_id.into(),
                roster_id: Some(format!("r{slot}")),
                draft_slot: Some(slot),
            });
        }
    }

    #[async_trait]
    impl LiveDraftProvider for FakeRoom {
        async fn draft_settings(&self, _draft_id: &str) -> Result<LiveDraftSettings, LiveError> {
            Ok(self.settings.clone())
        }

        async fn draft_picks(&self, _draft_id: &str) -> Result<Vec<LivePick>, LiveError> {
            if *self.failing.lock().unwrap() {
                return Err(LiveError::Malformed("room offline".into()));
            }
            Ok(self.picks.lock().unwrap().clone())
        }
    }

    fn pool() -> PlayerPool {
        let mut rows = Vec::new();
        for i in 0..10 {
            let f = i as f64;
            for (prefix, pos, base, offset) in [
                ("Rb", Position::RunningBack, 250.0, 1.0),
                ("Wr", Position::WideReceiver, 240.0, 2.0),
                ("Qb", Position::Quarterback, 300.0, 3.0),
                ("Te", Position::TightEnd, 150.0, 4.0),
            ] {
                rows.push(PlayerRow {
                    display_name: format!("{prefix} {i}"),
                    position: pos,
                    external_id: Some(format!("{}{i}", prefix.to_lowercase())),
                    points: FormatValues {
                        std: Some(base - 10.0 * f),
                        half_ppr: None,
                        ppr: None,
                    },
                    adp: FormatValues {
                        std: Some(offset + 4.0 * f),
                        half_ppr: None,
                        ppr: None,
                    },
                });
            }
        }
        PlayerPool::from_rows(rows)
    }

    fn config() -> Config {
        let mut strategy = StrategyConfig::default();
        strategy.vona.shortlist_size = 8;
        Config {
            league: LeagueConfig {
                teams: 4,
                rounds: 3,
                ..LeagueConfig::default()
            },
            live: LiveConfig::default(),
            strategy,
            sleeper: SleeperConfig::default(),
            data_paths: DataPaths {
                players: "unused.csv".into(),
            },
        }
    }

    fn manager(room: Arc<FakeRoom>) -> Arc<SessionManager> {
        Arc::new(SessionManager::new(
            config(),
            Arc::new(StaticPoolProvider::new(pool())),
            room,
        ))
    }

    fn live_request(slot: u32) -> StartRequest {
        StartRequest {
            pick_slot: slot,
            live_draft_id: Some("d1".into()),
            seed: Some(1),
            ..StartRequest::default()
        }
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let m = manager(Arc::new(FakeRoom::new(4, 3)));
        assert!(matches!(
            m.get_state("nope", None, None).await,
            Err(SessionError::SessionNotFound(_))
        ));
        assert!(matches!(m.close("nope").await, Err(SessionError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn start_rejects_bad_requests() {
        let m = manager(Arc::new(FakeRoom::new(4, 3)));
        let bad_slot = StartRequest {
            pick_slot: 9,
            ..StartRequest::default()
        };
        assert!(matches!(m.start(bad_slot).await, Err(SessionError::InvalidRequest(_))));

        let bad_format = StartRequest {
            pick_slot: 1,
            format: Some("superflex".into()),
            ..StartRequest::default()
        };
        assert!(matches!(m.start(bad_format).await, Err(SessionError::Valuation(_))));

        let missing_column = StartRequest {
            pick_slot: 1,
            format: Some("PPR".into()),
            ..StartRequest::default()
        };
        assert!(matches!(m.start(missing_column).await, Err(SessionError::Valuation(_))));
        assert_eq!(m.session_count().await, 0);
    }

    #[tokio::test]
    async fn start_rejects_oversized_leagues() {
        let m = manager(Arc::new(FakeRoom::new(4, 3)));
        let huge = StartRequest {
            pick_slot: 1,
            team_count: Some(70_000),
            round_count: Some(70_000),
            ..StartRequest::default()
        };
        assert!(matches!(m.start(huge).await, Err(SessionError::InvalidRequest(_))));

        let too_many_rounds = StartRequest {
            pick_slot: 1,
            team_count: Some(12),
            round_count: Some(MAX_ROUNDS + 1),
            ..StartRequest::default()
        };
        assert!(matches!(m.start(too_many_rounds).await, Err(SessionError::InvalidRequest(_))));

        let largest = StartRequest {
            pick_slot: 1,
            team_count: Some(MAX_TEAMS),
            round_count: Some(1),
            ..StartRequest::default()
        };
        assert!(m.start(largest).await.is_ok());
        assert_eq!(m.session_count().await, 1);
    }

    #[tokio::test]
    async fn live_start_rejects_oversized_room() {
        let mut room = FakeRoom::new(4, 3);
        room.settings.round_count = 70_000;
        let m = manager(Arc::new(room));
        assert!(matches!(
            m.start(live_request(1)).await,
            Err(SessionError::InvalidRequest(_))
        ));
        assert_eq!(m.session_count().await, 0);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let m = manager(Arc::new(FakeRoom::new(4, 3)));
        let a = m.start(StartRequest { pick_slot: 1, seed: Some(3), ..Default::default() }).await.unwrap();
        let b = m.start(StartRequest { pick_slot: 1, seed: Some(3), ..Default::default() }).await.unwrap();
        assert_ne!(a.session_id, b.session_id);

        m.apply_user_pick(&a.session_id, "Qb 0").await.unwrap();
        let state_b = m.get_state(&b.session_id, None, None).await.unwrap();
        assert_eq!(state_b.pick_number, 1);
        assert_eq!(state_b.drafted_count, 0);
        assert!(m
            .apply_user_pick(&b.session_id, "Qb 0")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn live_start_requires_resolvable_slot() {
        let mut room = FakeRoom::new(4, 3);
        room.settings.slot_to_roster_id.remove(&2);
        let m = manager(Arc::new(room));
        assert!(matches!(
            m.start(live_request(2)).await,
            Err(SessionError::UnresolvedRoster { slot: 2 })
        ));
    }

    #[tokio::test]
    async fn live_start_catches_up_and_polls() {
        let room = Arc::new(FakeRoom::new(4, 3));
        room.push("qb0", 1);
        let m = manager(room.clone());
        let id = m.start(live_request(3)).await.unwrap().session_id;

        let state = m.get_state(&id, None, None).await.unwrap();
        assert_eq!(state.pick_number, 2);
        assert_eq!(state.drafted_count, 1);
        assert!(!state.is_user_turn);
        assert_eq!(state.user_roster_id.as_deref(), Some("r3"));

        assert!(m.poll_live(&id).await.unwrap().is_noop());
        room.push("rb0", 2);
        let polled = m.poll_live(&id).await.unwrap();
        assert_eq!(polled.new_picks.len(), 1);
        assert_eq!(polled.new_pick_number, 3);
        assert!(m.get_state(&id, None, None).await.unwrap().is_user_turn);

        assert!(matches!(m.apply_cpu_pick(&id).await, Err(SessionError::NotSimulated)));
    }

    #[tokio::test]
    async fn upstream_failure_is_reported_in_state() {
        let room = Arc::new(FakeRoom::new(4, 3));
        let m = manager(room.clone());
        let id = m.start(live_request(1)).await.unwrap().session_id;

        *room.failing.lock().unwrap() = true;
        assert!(matches!(
            m.poll_live(&id).await,
            Err(SessionError::UpstreamUnavailable(_))
        ));
        let state = m.get_state(&id, None, None).await.unwrap();
        assert!(state.upstream_error.is_some());

        *room.failing.lock().unwrap() = false;
        m.poll_live(&id).await.unwrap();
        assert!(m.get_state(&id, None, None).await.unwrap().upstream_error.is_none());
    }

    #[tokio::test]
    async fn poll_on_simulated_session_is_not_live() {
        let m = manager(Arc::new(FakeRoom::new(4, 3)));
        let id = m.start(StartRequest { pick_slot: 1, ..Default::default() }).await.unwrap().session_id;
        assert!(matches!(m.poll_live(&id).await, Err(SessionError::NotLive)));
        assert!(m.get_state(&id, None, None).await.unwrap().user_roster_id.is_none());
        assert!(matches!(m.wait_for_user_turn(&id).await, Err(SessionError::NotLive)));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_returns_when_user_is_on_the_clock() {
        let room = Arc::new(FakeRoom::new(4, 3));
        let m = manager(room.clone());
        let id = m.start(live_request(3)).await.unwrap().session_id;

        let waiter = {
            let m = Arc::clone(&m);
            let id = id.clone();
            tokio::spawn(async move { m.wait_for_user_turn(&id).await })
        };
        tokio::time::sleep(Duration::from_secs(15)).await;
        room.push("qb0", 1);
        room.push("rb0", 2);

        let outcome = waiter.await.unwrap().unwrap();
        assert_eq!(outcome, WaitOutcome::UserTurn);
        assert_eq!(m.get_state(&id, None, None).await.unwrap().pick_number, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_is_cancelled_by_close() {
        let room = Arc::new(FakeRoom::new(4, 3));
        let m = manager(room);
        let id = m.start(live_request(3)).await.unwrap().session_id;

        let waiter = {
            let m = Arc::clone(&m);
            let id = id.clone();
            tokio::spawn(async move { m.wait_for_user_turn(&id).await })
        };
        tokio::time::sleep(Duration::from_secs(25)).await;
        m.close(&id).await.unwrap();

        assert_eq!(waiter.await.unwrap().unwrap(), WaitOutcome::Cancelled);
        assert_eq!(m.session_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_retries_through_upstream_failures() {
        let room = Arc::new(FakeRoom::new(4, 3));
        let m = manager(room.clone());
        let id = m.start(live_request(3)).await.unwrap().session_id;

        *room.failing.lock().unwrap() = true;
        let waiter = {
            let m = Arc::clone(&m);
            let id = id.clone();
            tokio::spawn(async move { m.wait_for_user_turn(&id).await })
        };
        // Ticks at 0s, 10s and 20s all hit the offline room.
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert!(!waiter.is_finished());
        assert!(m.get_state(&id, None, None).await.unwrap().upstream_error.is_some());

        *room.failing.lock().unwrap() = false;
        room.push("qb0", 1);
        room.push("rb0", 2);

        assert_eq!(waiter.await.unwrap().unwrap(), WaitOutcome::UserTurn);
        let state = m.get_state(&id, None, None).await.unwrap();
        assert_eq!(state.pick_number, 3);
        assert!(state.upstream_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_is_cancelled_by_eviction() {
        let room = Arc::new(FakeRoom::new(4, 3));
        let m = manager(room);
        let id = m.start(live_request(3)).await.unwrap().session_id;

        let waiter = {
            let m = Arc::clone(&m);
            let id = id.clone();
            tokio::spawn(async move { m.wait_for_user_turn(&id).await })
        };
        tokio::time::sleep(Duration::from_secs(15)).await;
        let later = Utc::now() + chrono::Duration::hours(5);
        assert_eq!(m.evict_idle(later).await, 1);

        assert_eq!(waiter.await.unwrap().unwrap(), WaitOutcome::Cancelled);
        assert_eq!(m.session_count().await, 0);
    }

    #[tokio::test]
    async fn live_start_survives_failed_initial_sync() {
        let room = Arc::new(FakeRoom::new(4, 3));
        room.push("qb0", 1);
        *room.failing.lock().unwrap() = true;
        let m = manager(room.clone());

        let id = m.start(live_request(3)).await.unwrap().session_id;
        let state = m.get_state(&id, None, None).await.unwrap();
        assert!(state.upstream_error.is_some());
        assert_eq!(state.pick_number, 1);
        assert_eq!(state.drafted_count, 0);

        *room.failing.lock().unwrap() = false;
        let polled = m.poll_live(&id).await.unwrap();
        assert_eq!(polled.new_picks.len(), 1);
        assert!(m.get_state(&id, None, None).await.unwrap().upstream_error.is_none());
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let m = manager(Arc::new(FakeRoom::new(4, 3)));
        let id = m.start(StartRequest { pick_slot: 1, ..Default::default() }).await.unwrap().session_id;

        assert_eq!(m.evict_idle(Utc::now()).await, 0);
        let later = Utc::now() + chrono::Duration::hours(5);
        assert_eq!(m.evict_idle(later).await, 1);
        assert!(matches!(
            m.apply_user_pick(&id, "Qb 0").await,
            Err(SessionError::SessionNotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn reaper_stops_on_shutdown() {
        let m = manager(Arc::new(FakeRoom::new(4, 3)));
        let (tx, rx) = watch::channel(false);
        let handle = m.spawn_reaper(rx);
        tokio::time::sleep(Duration::from_secs(600)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn pick_errors_leave_session_usable() {
        let m = manager(Arc::new(FakeRoom::new(4, 3)));
        let id = m.start(StartRequest { pick_slot: 1, ..Default::default() }).await.unwrap().session_id;
        assert!(matches!(
            m.apply_user_pick(&id, "Nobody").await,
            Err(SessionError::Draft(DraftError::NotFound { .. }))
        ));
        let result = m.apply_user_pick(&id, "Rb 0").await.unwrap();
        assert_eq!(result.new_pick_number, 2);
        let cpu = m.apply_cpu_pick(&id).await.unwrap();
        assert_eq!(cpu.team, 2);
    }
}
