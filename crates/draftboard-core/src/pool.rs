// Player pool providers.
//
// The pool is read once per session from a canonical player table. The CSV
// layout carries one projected-points column and one ADP column per scoring
// format; any of them may be absent.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::PoolError;
use crate::player::{FormatValues, PlayerPool, PlayerRow, PoolColumns, Position};

/// Source of the immutable per-session player pool.
pub trait PlayerPoolProvider: Send + Sync {
    fn load(&self) -> Result<Arc<PlayerPool>, PoolError>;
}

// ---------------------------------------------------------------------------
// CSV provider
// ---------------------------------------------------------------------------

/// Raw CSV row. Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    display_name: String,
    position: String,
    #[serde(default)]
    external_id: Option<String>,
    #[serde(default)]
    std_proj_pts: Option<f64>,
    #[serde(default)]
    half_ppr_proj_pts: Option<f64>,
    #[serde(default)]
    ppr_proj_pts: Option<f64>,
    #[serde(default)]
    std_adp: Option<f64>,
    #[serde(default)]
    half_ppr_adp: Option<f64>,
    #[serde(default)]
    ppr_adp: Option<f64>,
}

/// Drop NaN and infinite values so they read as "missing".
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn columns_from_headers(headers: &csv::StringRecord) -> PoolColumns {
    let has = |name: &str| headers.iter().any(|h| h.trim() == name);
    PoolColumns {
        points: FormatValues {
            std: has("std_proj_pts"),
            half_ppr: has("half_ppr_proj_pts"),
            ppr: has("ppr_proj_pts"),
        },
        adp: FormatValues {
            std: has("std_adp"),
            half_ppr: has("half_ppr_adp"),
            ppr: has("ppr_adp"),
        },
    }
}

/// Parse a player table from any reader. Malformed rows and rows with an
/// unknown position are skipped with a warning.
pub fn load_pool_from_reader<R: Read>(rdr: R) -> Result<PlayerPool, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let columns = columns_from_headers(reader.headers()?);

    let mut rows = Vec::new();
    for result in reader.deserialize::<RawPlayerRow>() {
        match result {
            Ok(raw) => {
                let Some(position) = Position::from_str_pos(&raw.position) else {
                    warn!(
                        "skipping player '{}': unknown position '{}'",
                        raw.display_name, raw.position
                    );
                    continue;
                };
                rows.push(PlayerRow {
                    display_name: raw.display_name,
                    position,
                    external_id: raw.external_id.filter(|id| !id.is_empty()),
                    points: FormatValues {
                        std: finite(raw.std_proj_pts),
                        half_ppr: finite(raw.half_ppr_proj_pts),
                        ppr: finite(raw.ppr_proj_pts),
                    },
                    adp: FormatValues {
                        std: finite(raw.std_adp),
                        half_ppr: finite(raw.half_ppr_adp),
                        ppr: finite(raw.ppr_adp),
                    },
                });
            }
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
            }
        }
    }

    Ok(PlayerPool::new(rows, columns))
}

/// Loads the pool from a CSV file on every call.
#[derive(Debug, Clone)]
pub struct CsvPoolProvider {
    path: PathBuf,
}

impl CsvPoolProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvPoolProvider { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PlayerPoolProvider for CsvPoolProvider {
    fn load(&self) -> Result<Arc<PlayerPool>, PoolError> {
        let file = std::fs::File::open(&self.path).map_err(|e| PoolError::Io {
            path: self.path.display().to_string(),
            source: e,
        })?;
        let pool = load_pool_from_reader(file).map_err(|e| PoolError::Csv {
            path: self.path.display().to_string(),
            source: e,
        })?;

        if pool.is_empty() {
            return Err(PoolError::Validation(format!(
                "{} produced zero valid player rows",
                self.path.display()
            )));
        }

        info!(
            "loaded {} players from {}",
            pool.len(),
            self.path.display()
        );
        Ok(Arc::new(pool))
    }
}

/// Hands out an already-built pool.
#[derive(Debug, Clone)]
pub struct StaticPoolProvider {
    pool: Arc<PlayerPool>,
}

impl StaticPoolProvider {
    pub fn new(pool: PlayerPool) -> Self {
        StaticPoolProvider {
            pool: Arc::new(pool),
        }
    }
}

impl PlayerPoolProvider for StaticPoolProvider {
    fn load(&self) -> Result<Arc<PlayerPool>, PoolError> {
        Ok(Arc::clone(&self.pool))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
