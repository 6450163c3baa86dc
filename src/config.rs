//! Loading game configuration (tuning + optional content bank) from TOML.
//!
//! See `GameConfig` for the expected schema. Every section is optional;
//! built-in seeds keep the service usable with no file at all.

use serde::Deserialize;
use tracing::{info, error};

use crate::domain::Difficulty;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GameConfig {
  #[serde(default)]
  pub tuning: Tuning,
  #[serde(default)]
  pub categories: Vec<CategoryCfg>,
  #[serde(default)]
  pub puzzles: Vec<PuzzleCfg>,
  #[serde(default)]
  pub users: Vec<UserCfg>,
}

/// Progression tuning knobs. Defaults mirror production values.
#[derive(Clone, Debug, Deserialize)]
pub struct Tuning {
  /// Puzzles drawn into each daily quest.
  #[serde(default = "default_quest_size")]
  pub quest_size: usize,
  /// Flat XP bonus paid once per completed daily quest.
  #[serde(default = "default_quest_bonus_xp")]
  pub quest_bonus_xp: u32,
  /// Width of the duplicate-submission replay window.
  #[serde(default = "default_replay_window_secs")]
  pub replay_window_secs: i64,
  /// Bounded wait for the quest completion lock before giving up.
  #[serde(default = "default_completion_lock_wait_ms")]
  pub completion_lock_wait_ms: u64,
}

fn default_quest_size() -> usize { 10 }
fn default_quest_bonus_xp() -> u32 { 100 }
fn default_replay_window_secs() -> i64 { 5 }
fn default_completion_lock_wait_ms() -> u64 { 2_000 }

impl Default for Tuning {
  fn default() -> Self {
    Self {
      quest_size: default_quest_size(),
      quest_bonus_xp: default_quest_bonus_xp(),
      replay_window_secs: default_replay_window_secs(),
      completion_lock_wait_ms: default_completion_lock_wait_ms(),
    }
  }
}

/// Category entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct CategoryCfg {
  pub id: String,
  pub name: String,
  #[serde(default = "default_true")] pub is_active: bool,
}

/// Puzzle entry accepted in TOML configuration. `time_limit_secs` must be
/// positive; offending entries are skipped at load with an error log.
#[derive(Clone, Debug, Deserialize)]
pub struct PuzzleCfg {
  #[serde(default)] pub id: Option<String>,
  pub question: String,
  #[serde(default)] pub options: Vec<String>,
  pub correct_answer: String,
  pub base_points: u32,
  pub time_limit_secs: u32,
  pub category_id: String,
  #[serde(default)] pub difficulty: Difficulty,
}

/// Pre-provisioned user profile (no auth flow in this service).
#[derive(Clone, Debug, Deserialize)]
pub struct UserCfg {
  pub id: String,
  #[serde(default)] pub username: Option<String>,
  #[serde(default)] pub difficulty_tier: Difficulty,
}

fn default_true() -> bool { true }

/// Attempt to load `GameConfig` from GAME_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_game_config_from_env() -> Option<GameConfig> {
  let path = std::env::var("GAME_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<GameConfig>(&s) {
      Ok(cfg) => {
        info!(target: "mindrush_backend", %path, "Loaded game config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "mindrush_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "mindrush_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
