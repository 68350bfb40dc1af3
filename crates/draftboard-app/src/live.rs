// Live-draft provider: settings and picks from a third-party draft room.
//
// The Sleeper public API is the shipped implementation. It needs no auth:
//   GET {base}/draft/{draft_id}        -> settings, type, slot_to_roster_id
//   GET {base}/draft/{draft_id}/picks  -> picks made so far, in order

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use draftboard_core::draft::DraftOrder;
use draftboard_core::ScoringFormat;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed live draft response: {0}")]
    Malformed(String),
}

/// League shape reported by the draft room.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveDraftSettings {
    pub team_count: usize,
    pub round_count: u32,
    /// `None` when the room's scoring type is not one the engine values.
    pub format: Option<ScoringFormat>,
    pub order: DraftOrder,
    /// Draft slot (1-based) to platform roster id.
    pub slot_to_roster_id: HashMap<u32, String>,
}

/// One pick as reported by the draft room.
#[derive(Debug, Clone, PartialEq)]
pub struct LivePick {
    pub pick_no: u32,
    pub player_id: String,
    pub roster_id: Option<String>,
    pub draft_slot: Option<u32>,
}

#[async_trait]
pub trait LiveDraftProvider: Send + Sync {
    async fn draft_settings(&self, draft_id: &str) -> Result<LiveDraftSettings, LiveError>;

    /// Every pick made so far, ordered by pick number.
    async fn draft_picks(&self, draft_id: &str) -> Result<Vec<LivePick>, LiveError>;
}

// ---------------------------------------------------------------------------
// Raw Sleeper payloads (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawDraft {
    #[serde(rename = "type")]
    draft_type: String,
    settings: RawDraftSettings,
    #[serde(default)]
    metadata: RawDraftMetadata,
    #[serde(default)]
    slot_to_roster_id: Option<HashMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RawDraftSettings {
    teams: usize,
    rounds: u32,
}

#[derive(Debug, Default, Deserialize)]
struct RawDraftMetadata {
    #[serde(default)]
    scoring_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPick {
    pick_no: u32,
    player_id: Value,
    #[serde(default)]
    roster_id: Value,
    #[serde(default)]
    draft_slot: Option<u32>,
}

/// Render a JSON id (number or string) as a string; `None` for null.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Map a room scoring type ("ppr", "half_ppr", "std", "dynasty_ppr", ...)
/// onto an engine format.
pub fn parse_scoring_type(s: &str) -> Option<ScoringFormat> {
    let s = s.to_lowercase();
    if s.contains("half") {
        Some(ScoringFormat::HalfPpr)
    } else if s.contains("ppr") {
        Some(ScoringFormat::Ppr)
    } else if s.contains("std") || s.contains("standard") {
        Some(ScoringFormat::Standard)
    } else {
        None
    }
}

fn parse_settings(raw: RawDraft) -> Result<LiveDraftSettings, LiveError> {
    let order = raw
        .draft_type
        .parse::<DraftOrder>()
        .map_err(LiveError::Malformed)?;
    if raw.settings.teams == 0 || raw.settings.rounds == 0 {
        return Err(LiveError::Malformed(
            "draft settings report zero teams or rounds".into(),
        ));
    }

    let mut slot_to_roster_id = HashMap::new();
    for (slot, roster) in raw.slot_to_roster_id.unwrap_or_default() {
        let Ok(slot) = slot.parse::<u32>() else {
            return Err(LiveError::Malformed(format!("bad draft slot '{}'", slot)));
        };
        if let Some(id) = id_string(&roster) {
            slot_to_roster_id.insert(slot, id);
        }
    }

    Ok(LiveDraftSettings {
        team_count: raw.settings.teams,
        round_count: raw.settings.rounds,
        format: raw.metadata.scoring_type.as_deref().and_then(parse_scoring_type),
        order,
        slot_to_roster_id,
    })
}

fn parse_picks(raw: Vec<RawPick>) -> Vec<LivePick> {
    let mut picks: Vec<LivePick> = raw
        .into_iter()
        .filter_map(|p| {
            Some(LivePick {
                pick_no: p.pick_no,
                player_id: id_string(&p.player_id)?,
                roster_id: id_string(&p.roster_id),
                draft_slot: p.draft_slot,
            })
        })
        .collect();
    picks.sort_by_key(|p| p.pick_no);
    picks
}

// ---------------------------------------------------------------------------
// Sleeper client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SleeperClient {
    http: reqwest::Client,
    base_url: String,
}

impl SleeperClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LiveError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(SleeperClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, LiveError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let res = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await?;
        Ok(res)
    }
}

#[async_trait]
impl LiveDraftProvider for SleeperClient {
    async fn draft_settings(&self, draft_id: &str) -> Result<LiveDraftSettings, LiveError> {
        let raw: RawDraft = self.get_json(&format!("/draft/{}", draft_id)).await?;
        parse_settings(raw)
    }

    async fn draft_picks(&self, draft_id: &str) -> Result<Vec<LivePick>, LiveError> {
        let raw: Vec<RawPick> = self.get_json(&format!("/draft/{}/picks", draft_id)).await?;
        Ok(parse_picks(raw))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
