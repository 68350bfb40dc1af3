// Draft state: the pool snapshot, the drafted set, and the pick cursor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::schedule::DraftOrder;
use crate::error::{DraftError, ValuationError};
use crate::player::{PlayerId, PlayerPool, PlayerRecord, Position, ScoringFormat};

/// League shape for one draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSettings {
    pub format: ScoringFormat,
    pub team_count: usize,
    pub round_count: u32,
    pub order: DraftOrder,
}

impl DraftSettings {
    pub fn total_picks(&self) -> u32 {
        u32::try_from(self.team_count)
            .unwrap_or(u32::MAX)
            .saturating_mul(self.round_count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    CollectingPicks,
    Complete,
}

/// Mutable state of one draft.
///
/// The pool is shared read-only; the drafted bitset, pick history, and VORP
/// column are owned. Cloning copies only those, so a lookahead branch costs
/// O(players) and never aliases the source state's mutable data.
#[derive(Debug, Clone)]
pub struct DraftState {
    pool: Arc<PlayerPool>,
    pub settings: DraftSettings,
    drafted: Vec<bool>,
    history: Vec<PlayerId>,
    vorp: Vec<f64>,
    /// 1-based number of the next pick to resolve.
    current_pick: u32,
}

impl DraftState {
    /// Start a draft. Fails when the pool has no projected points for the
    /// requested format.
    pub fn new(pool: Arc<PlayerPool>, settings: DraftSettings) -> Result<Self, ValuationError> {
        pool.require_points(settings.format)?;
        let n = pool.len();
        Ok(DraftState {
            pool,
            settings,
            drafted: vec![false; n],
            history: Vec::new(),
            vorp: vec![0.0; n],
            current_pick: 1,
        })
    }

    pub fn pool(&self) -> &PlayerPool {
        &self.pool
    }

    pub fn shared_pool(&self) -> Arc<PlayerPool> {
        Arc::clone(&self.pool)
    }

    pub fn player(&self, id: PlayerId) -> &PlayerRecord {
        self.pool.get(id)
    }

    pub fn format(&self) -> ScoringFormat {
        self.settings.format
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Undrafted players in pool order.
    pub fn available_players(&self) -> impl Iterator<Item = &PlayerRecord> + '_ {
        self.pool.iter().filter(|p| !self.drafted[p.id.0])
    }

    pub fn available_ids(&self) -> Vec<PlayerId> {
        self.available_players().map(|p| p.id).collect()
    }

    pub fn available_count(&self) -> usize {
        self.pool.len() - self.history.len()
    }

    pub fn is_drafted(&self, id: PlayerId) -> bool {
        self.drafted[id.0]
    }

    pub fn drafted_count(&self) -> usize {
        self.history.len()
    }

    /// Drafted players in the order they were taken.
    pub fn history(&self) -> &[PlayerId] {
        &self.history
    }

    pub fn current_pick(&self) -> u32 {
        self.current_pick
    }

    pub fn total_picks(&self) -> u32 {
        self.settings.total_picks()
    }

    pub fn status(&self) -> DraftStatus {
        if self.available_count() == 0 || self.current_pick > self.total_picks() {
            DraftStatus::Complete
        } else {
            DraftStatus::CollectingPicks
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status() == DraftStatus::Complete
    }

    pub fn vorp(&self, id: PlayerId) -> f64 {
        self.vorp[id.0]
    }

    pub(crate) fn set_vorp(&mut self, id: PlayerId, value: f64) {
        self.vorp[id.0] = value;
    }

    /// Points for `id` in the draft's scoring format.
    pub fn points(&self, id: PlayerId) -> f64 {
        self.pool.get(id).points(self.settings.format)
    }

    pub fn adp(&self, id: PlayerId) -> Option<f64> {
        self.pool.get(id).adp(self.settings.format)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Draft a player by display name or normalized identity.
    ///
    /// On success the player is marked drafted, the pick cursor advances by
    /// one, and the player's position is returned. Any failure leaves the
    /// state untouched.
    pub fn draft_player(&mut self, name: &str) -> Result<Position, DraftError> {
        if self.is_complete() {
            return Err(DraftError::DraftComplete);
        }
        let id = self.pool.find(name).ok_or_else(|| DraftError::NotFound {
            name: name.to_string(),
        })?;
        self.draft_id(id)
    }

    /// Draft a player already resolved to a pool id.
    pub fn draft_id(&mut self, id: PlayerId) -> Result<Position, DraftError> {
        if self.is_complete() {
            return Err(DraftError::DraftComplete);
        }
        let player = self.pool.get(id);
        if self.drafted[id.0] {
            return Err(DraftError::AlreadyDrafted {
                name: player.display_name.clone(),
            });
        }
        let position = player.position;
        debug!(
            "pick {}: {} ({})",
            self.current_pick, player.display_name, position
        );

        self.drafted[id.0] = true;
        self.history.push(id);
        self.vorp[id.0] = 0.0;
        self.current_pick += 1;
        Ok(position)
    }

    /// Move the pick cursor to an externally reported position. The cursor
    /// never moves backwards.
    pub fn sync_current_pick(&mut self, pick: u32) {
        if pick > self.current_pick {
            self.current_pick = pick;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
