// Player records, positions, scoring formats, and the immutable player pool.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ValuationError;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Football positions a player can be drafted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "QB")]
    Quarterback,
    #[serde(rename = "RB")]
    RunningBack,
    #[serde(rename = "WR")]
    WideReceiver,
    #[serde(rename = "TE")]
    TightEnd,
    #[serde(rename = "K")]
    Kicker,
    #[serde(rename = "DEF")]
    Defense,
}

impl Position {
    /// Every position, in roster display order.
    pub const ALL: [Position; 6] = [
        Position::Quarterback,
        Position::RunningBack,
        Position::WideReceiver,
        Position::TightEnd,
        Position::Kicker,
        Position::Defense,
    ];

    /// Positions that receive a VORP valuation. K and DEF stay at zero.
    pub const SKILL: [Position; 4] = [
        Position::Quarterback,
        Position::RunningBack,
        Position::WideReceiver,
        Position::TightEnd,
    ];

    /// Parse a position code. Accepts "D/ST" and "DST" as defense aliases.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "K" | "PK" => Some(Position::Kicker),
            "DEF" | "DST" | "D/ST" => Some(Position::Defense),
            _ => None,
        }
    }

    /// The code used in roster slot names ("QB1", "DEF", ...).
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Kicker => "K",
            Position::Defense => "DEF",
        }
    }

    /// Whether a FLEX slot may hold this position.
    pub fn is_flex_eligible(&self) -> bool {
        matches!(
            self,
            Position::RunningBack | Position::WideReceiver | Position::TightEnd
        )
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// One value per position. Field names match the position codes so TOML
/// tables read naturally (`QB = 0.8`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct PositionTable<T> {
    pub QB: T,
    pub RB: T,
    pub WR: T,
    pub TE: T,
    pub K: T,
    pub DEF: T,
}

impl<T: Copy> PositionTable<T> {
    pub fn uniform(value: T) -> Self {
        PositionTable {
            QB: value,
            RB: value,
            WR: value,
            TE: value,
            K: value,
            DEF: value,
        }
    }

    pub fn get(&self, position: Position) -> T {
        match position {
            Position::Quarterback => self.QB,
            Position::RunningBack => self.RB,
            Position::WideReceiver => self.WR,
            Position::TightEnd => self.TE,
            Position::Kicker => self.K,
            Position::Defense => self.DEF,
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring format
// ---------------------------------------------------------------------------

/// Supported fantasy scoring formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoringFormat {
    #[serde(rename = "STD")]
    Standard,
    #[serde(rename = "HalfPPR")]
    HalfPpr,
    #[serde(rename = "PPR")]
    Ppr,
}

impl ScoringFormat {
    pub fn display_str(&self) -> &'static str {
        match self {
            ScoringFormat::Standard => "STD",
            ScoringFormat::HalfPpr => "HalfPPR",
            ScoringFormat::Ppr => "PPR",
        }
    }

    /// Name of the projected-points column for this format in the pool table.
    pub fn points_column(&self) -> &'static str {
        match self {
            ScoringFormat::Standard => "std_proj_pts",
            ScoringFormat::HalfPpr => "half_ppr_proj_pts",
            ScoringFormat::Ppr => "ppr_proj_pts",
        }
    }

    /// Name of the ADP column for this format in the pool table.
    pub fn adp_column(&self) -> &'static str {
        match self {
            ScoringFormat::Standard => "std_adp",
            ScoringFormat::HalfPpr => "half_ppr_adp",
            ScoringFormat::Ppr => "ppr_adp",
        }
    }
}

impl FromStr for ScoringFormat {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "std" | "standard" => Ok(ScoringFormat::Standard),
            "halfppr" | "half_ppr" | "half" | "0.5ppr" => Ok(ScoringFormat::HalfPpr),
            "ppr" => Ok(ScoringFormat::Ppr),
            _ => Err(ValuationError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ScoringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// One value per scoring format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatValues<T> {
    pub std: T,
    pub half_ppr: T,
    pub ppr: T,
}

impl<T: Copy> FormatValues<T> {
    pub fn get(&self, format: ScoringFormat) -> T {
        match format {
            ScoringFormat::Standard => self.std,
            ScoringFormat::HalfPpr => self.half_ppr,
            ScoringFormat::Ppr => self.ppr,
        }
    }
}

// ---------------------------------------------------------------------------
// Name normalization
// ---------------------------------------------------------------------------

const GENERATIONAL_SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv"];

/// Normalize a player name into its pool identity.
///
/// Lower-cases, folds accented Latin letters to their base letter, drops
/// apostrophes and every other punctuation character, strips a trailing
/// generational suffix, and collapses runs of whitespace. "Odell Beckham Jr."
/// and "odell beckham" collide, as do "José" and "Jose".
pub fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(fold_accent)
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    if tokens.len() > 1 {
        if let Some(last) = tokens.last() {
            if GENERATIONAL_SUFFIXES.contains(last) {
                tokens.pop();
            }
        }
    }
    tokens.join(" ")
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        _ => c,
    }
}

/// Normalize an external (live platform) player id. Some feeds carry
/// numeric ids as floats ("4046.0").
pub fn normalize_external_id(id: &str) -> String {
    let trimmed = id.trim();
    trimmed.strip_suffix(".0").unwrap_or(trimmed).to_string()
}

// ---------------------------------------------------------------------------
// Player records
// ---------------------------------------------------------------------------

/// Index of a player in the pool arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub usize);

/// A raw row handed over by a pool provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRow {
    pub display_name: String,
    pub position: Position,
    pub external_id: Option<String>,
    pub points: FormatValues<Option<f64>>,
    pub adp: FormatValues<Option<f64>>,
}

/// An immutable player record. Derived values (VORP, VONA) live in the
/// draft state and session, never here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    /// Normalized name; the pool's identity key.
    pub identity: String,
    pub display_name: String,
    pub position: Position,
    pub external_id: Option<String>,
    pub points: FormatValues<Option<f64>>,
    pub adp: FormatValues<Option<f64>>,
}

impl PlayerRecord {
    /// Projected points for `format`, zero when the row has no value.
    pub fn points(&self, format: ScoringFormat) -> f64 {
        self.points.get(format).unwrap_or(0.0)
    }

    pub fn adp(&self, format: ScoringFormat) -> Option<f64> {
        self.adp.get(format)
    }
}

/// Which per-format columns the provider actually supplied.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoolColumns {
    pub points: FormatValues<bool>,
    pub adp: FormatValues<bool>,
}

// ---------------------------------------------------------------------------
// Player pool
// ---------------------------------------------------------------------------

/// Arena of player records keyed by normalized identity.
///
/// Built once per session and shared by reference between the live draft
/// state and every lookahead clone.
#[derive(Debug, Clone)]
pub struct PlayerPool {
    players: Vec<PlayerRecord>,
    by_identity: HashMap<String, PlayerId>,
    by_external_id: HashMap<String, PlayerId>,
    columns: PoolColumns,
}

impl PlayerPool {
    /// Build a pool from provider rows. A row whose normalized identity was
    /// already seen is dropped.
    pub fn new(rows: Vec<PlayerRow>, columns: PoolColumns) -> Self {
        let mut players = Vec::with_capacity(rows.len());
        let mut by_identity = HashMap::with_capacity(rows.len());
        let mut by_external_id = HashMap::new();

        for row in rows {
            let identity = normalize_name(&row.display_name);
            if identity.is_empty() {
                warn!("skipping pool row with empty name");
                continue;
            }
            if by_identity.contains_key(&identity) {
                warn!(
                    "duplicate player identity '{}' ({}), keeping first row",
                    identity, row.display_name
                );
                continue;
            }

            let id = PlayerId(players.len());
            by_identity.insert(identity.clone(), id);

            let external_id = row.external_id.as_deref().map(normalize_external_id);
            if let Some(ext) = &external_id {
                by_external_id.entry(ext.clone()).or_insert(id);
            }

            players.push(PlayerRecord {
                id,
                identity,
                display_name: row.display_name.trim().to_string(),
                position: row.position,
                external_id,
                points: row.points,
                adp: row.adp,
            });
        }

        PlayerPool {
            players,
            by_identity,
            by_external_id,
            columns,
        }
    }

    /// Build a pool, treating a format column as present when any row has a
    /// value for it.
    pub fn from_rows(rows: Vec<PlayerRow>) -> Self {
        let mut columns = PoolColumns::default();
        for row in &rows {
            columns.points.std |= row.points.std.is_some();
            columns.points.half_ppr |= row.points.half_ppr.is_some();
            columns.points.ppr |= row.points.ppr.is_some();
            columns.adp.std |= row.adp.std.is_some();
            columns.adp.half_ppr |= row.adp.half_ppr.is_some();
            columns.adp.ppr |= row.adp.ppr.is_some();
        }
        Self::new(rows, columns)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, id: PlayerId) -> &PlayerRecord {
        &self.players[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.iter()
    }

    pub fn columns(&self) -> PoolColumns {
        self.columns
    }

    /// Look a player up by display name or identity.
    pub fn find(&self, name: &str) -> Option<PlayerId> {
        self.by_identity.get(&normalize_name(name)).copied()
    }

    /// Look a player up by live-platform id.
    pub fn find_external(&self, external_id: &str) -> Option<PlayerId> {
        self.by_external_id
            .get(&normalize_external_id(external_id))
            .copied()
    }

    /// Fail with `MissingColumn` unless the pool carries projected points
    /// for `format`.
    pub fn require_points(&self, format: ScoringFormat) -> Result<(), ValuationError> {
        if self.columns.points.get(format) {
            Ok(())
        } else {
            Err(ValuationError::MissingColumn {
                column: format.points_column().to_string(),
            })
        }
    }
}
