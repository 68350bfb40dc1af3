// Configuration loading and parsing (league.toml, strategy.toml).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use draftboard_core::draft::{DraftOrder, RosterTemplate};
use draftboard_core::policy::{AutoPickConfig, CpuPolicyConfig};
use draftboard_core::valuation::vorp::default_adjustments;
use draftboard_core::{PositionTable, ScoringFormat};
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub live: LiveConfig,
    pub strategy: StrategyConfig,
    pub sleeper: SleeperConfig,
    pub data_paths: DataPaths,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueSection,
    #[serde(default)]
    live: LiveConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct LeagueSection {
    teams: usize,
    rounds: u32,
    format: String,
    order: String,
    pick_slot: u32,
    #[serde(default)]
    roster: Option<Vec<String>>,
}

/// League shape with format and order already parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct LeagueConfig {
    pub teams: usize,
    pub rounds: u32,
    pub format: ScoringFormat,
    pub order: DraftOrder,
    /// 1-based draft slot of the user's team.
    pub pick_slot: u32,
    pub roster: RosterTemplate,
}

impl Default for LeagueConfig {
    fn default() -> Self {
        LeagueConfig {
            teams: 12,
            rounds: 20,
            format: ScoringFormat::Standard,
            order: DraftOrder::Snake,
            pick_slot: 1,
            roster: RosterTemplate::default(),
        }
    }
}

/// Live-assistant target. Without a draft id the binary runs self-play.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LiveConfig {
    #[serde(default)]
    pub draft_id: Option<String>,
}

// ---------------------------------------------------------------------------
// strategy.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire strategy.toml file.
#[derive(Debug, Clone, Deserialize)]
struct StrategyFile {
    #[serde(default = "default_adjustments")]
    positional_adjustments: PositionTable<f64>,
    #[serde(default)]
    cpu: CpuPolicyConfig,
    #[serde(default)]
    auto_pick: AutoPickConfig,
    #[serde(default)]
    vona: VonaConfig,
    #[serde(default)]
    session: SessionConfig,
    #[serde(default)]
    sleeper: SleeperConfig,
    data_paths: DataPaths,
}

/// Valuation and pick-policy tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub adjustments: PositionTable<f64>,
    pub cpu: CpuPolicyConfig,
    pub auto_pick: AutoPickConfig,
    pub vona: VonaConfig,
    pub session: SessionConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            adjustments: default_adjustments(),
            cpu: CpuPolicyConfig::default(),
            auto_pick: AutoPickConfig::default(),
            vona: VonaConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct VonaConfig {
    /// Players, by ADP, evaluated on each refresh.
    pub shortlist_size: usize,
}

impl Default for VonaConfig {
    fn default() -> Self {
        VonaConfig { shortlist_size: 50 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_ttl_secs: u64,
    pub reaper_interval_secs: u64,
    pub poll_interval_secs: u64,
    pub display_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            idle_ttl_secs: 4 * 60 * 60,
            reaper_interval_secs: 5 * 60,
            poll_interval_secs: 10,
            display_limit: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SleeperConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for SleeperConfig {
    fn default() -> Self {
        SleeperConfig {
            base_url: "https://api.sleeper.app/v1".into(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataPaths {
    pub players: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` and
/// `config/strategy.toml` relative to `base_dir`.
///
/// Does not copy defaults. Prefer `load_config()`.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- league.toml (required) ---
    let league_path = config_dir.join(LEAGUE_FILE);
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;
    let league = parse_league(league_file.league)?;

    // --- strategy.toml (required) ---
    let strategy_path = config_dir.join(STRATEGY_FILE);
    let strategy_text = read_file(&strategy_path)?;
    let strategy_file: StrategyFile =
        toml::from_str(&strategy_text).map_err(|e| ConfigError::ParseError {
            path: strategy_path.clone(),
            source: e,
        })?;

    let strategy = StrategyConfig {
        adjustments: strategy_file.positional_adjustments,
        cpu: strategy_file.cpu,
        auto_pick: strategy_file.auto_pick,
        vona: strategy_file.vona,
        session: strategy_file.session,
    };

    let config = Config {
        league,
        live: league_file.live,
        strategy,
        sleeper: strategy_file.sleeper,
        data_paths: strategy_file.data_paths,
    };

    validate(&config)?;

    Ok(config)
}

fn parse_league(raw: LeagueSection) -> Result<LeagueConfig, ConfigError> {
    let format = raw
        .format
        .parse::<ScoringFormat>()
        .map_err(|e| invalid("league.format", e.to_string()))?;
    let order = raw
        .order
        .parse::<DraftOrder>()
        .map_err(|e| invalid("league.order", e))?;
    Ok(LeagueConfig {
        teams: raw.teams,
        rounds: raw.rounds,
        format,
        order,
        pick_slot: raw.pick_slot,
        roster: raw.roster.map(RosterTemplate).unwrap_or_default(),
    })
}

/// Files `load_config_from` reads from `config/`.
const LEAGUE_FILE: &str = "league.toml";
const STRATEGY_FILE: &str = "strategy.toml";
const CONFIG_FILES: [&str; 2] = [LEAGUE_FILE, STRATEGY_FILE];

/// Install `league.toml` and `strategy.toml` into `config/` from `defaults/`
/// when they are missing. A file the user already has is never overwritten.
/// Returns the paths that were installed.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    let missing: Vec<&str> = CONFIG_FILES
        .into_iter()
        .filter(|name| !config_dir.join(name).is_file())
        .collect();
    if missing.is_empty() {
        return Ok(Vec::new());
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create {}: {e}", config_dir.display()),
    })?;

    let mut installed = Vec::with_capacity(missing.len());
    for name in missing {
        let source = defaults_dir.join(name);
        if !source.is_file() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "config/{name} is missing and {} has no default for it",
                    defaults_dir.display()
                ),
            });
        }
        let target = config_dir.join(name);
        std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to install {}: {e}", target.display()),
        })?;
        installed.push(target);
    }
    Ok(installed)
}

/// Pick the directory config is loaded from: the working directory when it
/// has `config/` or `defaults/`, otherwise the platform config directory.
pub fn resolve_base_dir(cwd: &Path) -> PathBuf {
    if cwd.join("config").exists() || cwd.join("defaults").exists() {
        return cwd.to_path_buf();
    }
    ProjectDirs::from("", "", "draftboard")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .filter(|dir| dir.join("config").exists() || dir.join("defaults").exists())
        .unwrap_or_else(|| cwd.to_path_buf())
}

/// Loads config relative to the working directory (or the platform config
/// directory), copying defaults first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    let base = resolve_base_dir(&cwd);
    ensure_config_files(&base)?;
    load_config_from(&base)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let league = &config.league;
    if league.teams == 0 {
        return Err(invalid("league.teams", "must be greater than 0"));
    }
    if league.rounds == 0 {
        return Err(invalid("league.rounds", "must be greater than 0"));
    }
    if league.pick_slot == 0 || league.pick_slot as usize > league.teams {
        return Err(invalid(
            "league.pick_slot",
            format!("must be between 1 and {}, got {}", league.teams, league.pick_slot),
        ));
    }
    if league.roster.is_empty() {
        return Err(invalid("league.roster", "must declare at least one slot"));
    }

    let adj = &config.strategy.adjustments;
    let adj_fields: &[(&str, f64)] = &[
        ("positional_adjustments.QB", adj.QB),
        ("positional_adjustments.RB", adj.RB),
        ("positional_adjustments.WR", adj.WR),
        ("positional_adjustments.TE", adj.TE),
        ("positional_adjustments.K", adj.K),
        ("positional_adjustments.DEF", adj.DEF),
    ];
    for (name, val) in adj_fields {
        if *val < 0.0 {
            return Err(invalid(name, format!("must be >= 0, got {val}")));
        }
    }

    let cpu = &config.strategy.cpu;
    let auto = &config.strategy.auto_pick;
    let weight_fields: &[(&str, f64)] = &[
        ("cpu.simulation_weights.vorp", cpu.simulation_weights.vorp),
        ("cpu.simulation_weights.adp", cpu.simulation_weights.adp),
        ("cpu.live_weights.vorp", cpu.live_weights.vorp),
        ("cpu.live_weights.adp", cpu.live_weights.adp),
        ("cpu.need_multiplier", cpu.need_multiplier),
        ("cpu.saturation_multiplier", cpu.saturation_multiplier),
        ("cpu.scarcity_bonus", cpu.scarcity_bonus),
        ("auto_pick.vona_weight", auto.vona_weight),
        ("auto_pick.vorp_weight", auto.vorp_weight),
        ("auto_pick.adp_weight", auto.adp_weight),
    ];
    for (name, val) in weight_fields {
        if *val < 0.0 {
            return Err(invalid(name, format!("must be >= 0, got {val}")));
        }
    }

    if cpu.pick_probabilities.iter().any(|p| *p < 0.0) {
        return Err(invalid("cpu.pick_probabilities", "must not contain negative weights"));
    }
    if cpu.pick_probabilities.iter().sum::<f64>() <= 0.0 {
        return Err(invalid("cpu.pick_probabilities", "must sum to more than 0"));
    }
    if cpu.shortlist_size == 0 {
        return Err(invalid("cpu.shortlist_size", "must be > 0"));
    }
    if config.strategy.vona.shortlist_size == 0 {
        return Err(invalid("vona.shortlist_size", "must be > 0"));
    }

    let session = &config.strategy.session;
    let session_fields: &[(&str, u64)] = &[
        ("session.idle_ttl_secs", session.idle_ttl_secs),
        ("session.reaper_interval_secs", session.reaper_interval_secs),
        ("session.poll_interval_secs", session.poll_interval_secs),
    ];
    for (name, val) in session_fields {
        if *val == 0 {
            return Err(invalid(name, "must be > 0"));
        }
    }
    if session.display_limit == 0 {
        return Err(invalid("session.display_limit", "must be > 0"));
    }

    if config.sleeper.base_url.trim().is_empty() {
        return Err(invalid("sleeper.base_url", "must not be empty"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: returns the path to the draftboard-app crate root (works
    /// whether `cargo test` runs from the crate root or the workspace root).
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("crates/draftboard-app/defaults").exists() {
            cwd.join("crates/draftboard-app")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    /// Copy the shipped defaults into a fresh temp dir's `config/`.
    fn temp_config_dir(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        let root = project_root();
        for file in ["league.toml", "strategy.toml"] {
            fs::copy(root.join("defaults").join(file), tmp.join("config").join(file)).unwrap();
        }
        tmp
    }

    #[test]
    fn load_valid_config_from_defaults() {
        let tmp = temp_config_dir("draftboard_config_defaults");
        let config = load_config_from(&tmp).expect("should load valid config");

        assert_eq!(config.league.teams, 12);
        assert_eq!(config.league.rounds, 20);
        assert_eq!(config.league.format, ScoringFormat::Standard);
        assert_eq!(config.league.order, DraftOrder::Snake);
        assert_eq!(config.league.pick_slot, 1);
        assert_eq!(config.league.roster, RosterTemplate::default());
        assert!(config.live.draft_id.is_none());

        assert!((config.strategy.adjustments.QB - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.strategy.cpu, CpuPolicyConfig::default());
        assert_eq!(config.strategy.auto_pick, AutoPickConfig::default());
        assert_eq!(config.strategy.vona.shortlist_size, 50);
        assert_eq!(config.strategy.session.poll_interval_secs, 10);
        assert_eq!(config.strategy.session.idle_ttl_secs, 14_400);
        assert_eq!(config.sleeper.base_url, "https://api.sleeper.app/v1");
        assert_eq!(config.data_paths.players, "data/players.csv");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn format_aliases_are_accepted() {
        let tmp = temp_config_dir("draftboard_config_alias");
        let league = tmp.join("config/league.toml");
        let text = fs::read_to_string(&league)
            .unwrap()
            .replace("format = \"STD\"", "format = \"half_ppr\"");
        fs::write(&league, text).unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.league.format, ScoringFormat::HalfPpr);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn unsupported_format_fails_validation() {
        let tmp = temp_config_dir("draftboard_config_bad_format");
        let league = tmp.join("config/league.toml");
        let text = fs::read_to_string(&league)
            .unwrap()
            .replace("format = \"STD\"", "format = \"2QB\"");
        fs::write(&league, text).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "league.format"),
            other => panic!("expected ValidationError, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn pick_slot_outside_league_fails() {
        let tmp = temp_config_dir("draftboard_config_bad_slot");
        let league = tmp.join("config/league.toml");
        let text = fs::read_to_string(&league)
            .unwrap()
            .replace("pick_slot = 1", "pick_slot = 13");
        fs::write(&league, text).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "league.pick_slot"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn zero_probability_table_fails() {
        let tmp = temp_config_dir("draftboard_config_zero_probs");
        let strategy = tmp.join("config/strategy.toml");
        let mut text = fs::read_to_string(&strategy).unwrap();
        text = text.replace(
            "pick_probabilities = [0.60, 0.20, 0.10, 0.05, 0.02, 0.01, 0.005, 0.005, 0.005, 0.005]",
            "pick_probabilities = [0.0, 0.0]",
        );
        fs::write(&strategy, text).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "cpu.pick_probabilities"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_league_file_is_not_found() {
        let tmp = std::env::temp_dir().join("draftboard_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_installs_only_missing_files() {
        let tmp = std::env::temp_dir().join("draftboard_config_ensure");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("defaults/league.toml"), "x").unwrap();
        fs::write(tmp.join("defaults/strategy.toml"), "y").unwrap();
        fs::write(tmp.join("defaults/notes.toml"), "z").unwrap();
        fs::write(tmp.join("config/strategy.toml"), "edited").unwrap();

        let installed = ensure_config_files(&tmp).unwrap();
        assert_eq!(installed, vec![tmp.join("config/league.toml")]);
        assert_eq!(fs::read_to_string(tmp.join("config/league.toml")).unwrap(), "x");
        assert_eq!(fs::read_to_string(tmp.join("config/strategy.toml")).unwrap(), "edited");
        assert!(!tmp.join("config/notes.toml").exists());

        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_without_default_fails() {
        let tmp = std::env::temp_dir().join("draftboard_config_empty");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults/league.toml"), "x").unwrap();
        let err = ensure_config_files(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::DefaultsCopyError { ref message } if message.contains("strategy.toml")));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn resolve_base_dir_prefers_cwd_with_config() {
        let root = project_root();
        assert_eq!(resolve_base_dir(&root), root);
    }
}
