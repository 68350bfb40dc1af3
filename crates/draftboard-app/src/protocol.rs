// Request and response shapes for the session API.
//
// Field names serialize in camelCase so the shapes can be handed to an HTTP
// or IPC layer as-is.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use draftboard_core::lookahead::VonaOutcome;
use draftboard_core::Position;
use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Parameters for starting a session. Unset league fields fall back to the
/// configured league, or to the live draft's own settings in live mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartRequest {
    /// 1-based draft slot of the user's team.
    pub pick_slot: u32,
    pub live_draft_id: Option<String>,
    /// Let `apply_cpu_pick` also make the user's picks.
    pub non_interactive: bool,
    pub team_count: Option<usize>,
    pub round_count: Option<u32>,
    pub format: Option<String>,
    pub order: Option<String>,
    /// Seed for CPU picks and lookahead. Entropy when unset.
    pub seed: Option<u64>,
}

/// Which players `get_state` lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionFilter {
    #[default]
    All,
    /// RB, WR and TE.
    Flex,
    Only(Position),
}

impl PositionFilter {
    pub fn matches(&self, position: Position) -> bool {
        match self {
            PositionFilter::All => true,
            PositionFilter::Flex => position.is_flex_eligible(),
            PositionFilter::Only(p) => *p == position,
        }
    }
}

impl FromStr for PositionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "" | "ALL" => Ok(PositionFilter::All),
            "FLEX" => Ok(PositionFilter::Flex),
            other => Position::from_str_pos(other)
                .map(PositionFilter::Only)
                .ok_or_else(|| format!("unknown position filter '{}'", s)),
        }
    }
}

/// Ordering of the available-player list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Ascending, missing ADP last.
    #[default]
    Adp,
    Vorp,
    Vona,
    Points,
}

impl SortKey {
    /// Parse a sort key, falling back to ADP for anything unrecognized.
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "ADP" => SortKey::Adp,
            "VORP" => SortKey::Vorp,
            "VONA" => SortKey::Vona,
            "POINTS" | "PTS" => SortKey::Points,
            other => {
                warn!("unknown sort key '{}', sorting by ADP", other);
                SortKey::Adp
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatusView {
    InProgress,
    Completed,
}

impl fmt::Display for DraftStatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftStatusView::InProgress => write!(f, "in_progress"),
            DraftStatusView::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Simulated,
    Live,
}

/// One row of the available-player list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub name: String,
    pub position: Position,
    pub points: f64,
    pub vorp: f64,
    /// Present only when a VONA estimate exists for the current pick.
    pub vona: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vona_outcome: Option<VonaOutcome>,
    pub adp: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateView {
    pub session_id: String,
    pub mode: SessionMode,
    pub pick_number: u32,
    pub is_user_turn: bool,
    /// 1-based draft slot on the clock; `None` once the draft is over.
    pub on_clock_team: Option<u32>,
    pub available_players: Vec<PlayerView>,
    pub drafted_count: usize,
    pub total_picks: u32,
    pub status: DraftStatusView,
    /// The user's roster id in the live room.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_roster_id: Option<String>,
    /// Last live-provider failure, cleared by the next successful poll.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPickResult {
    pub player_name: String,
    pub position: Position,
    pub new_pick_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuPickResult {
    pub player_name: String,
    pub position: Position,
    /// 1-based draft slot of the team that picked.
    pub team: u32,
    pub new_pick_number: u32,
}

/// A pick reported by the live platform and applied to the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LivePickView {
    pub pick_number: u32,
    pub player_name: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResult {
    pub new_picks: Vec<LivePickView>,
    pub new_pick_number: u32,
}

impl PollResult {
    pub fn is_noop(&self) -> bool {
        self.new_picks.is_empty()
    }
}

/// One slot of a team's roster.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSlotView {
    pub slot: String,
    pub player_name: Option<String>,
    pub position: Option<Position>,
}

/// On-demand VONA by display name.
pub type VonaMap = BTreeMap<String, f64>;
