//! Domain models used by the backend: puzzles, categories, user progression,
//! attempt records, streaks, daily quests, and the milestone table.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Difficulty tier of a puzzle; a user's profile tier selects which puzzles
/// enter their daily quest.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Beginner,
  Intermediate,
  Advanced,
  Expert,
}
impl Default for Difficulty {
  fn default() -> Self { Difficulty::Beginner }
}

/// Where did we get the puzzle from?
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleSource {
  LocalBank,   // from user-provided TOML bank
  Seed,  // built-in seeds (last resort)
}

/// Core puzzle structure persisted in-memory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Puzzle {
  pub id: String,
  pub question: String,
  #[serde(default)] pub options: Vec<String>,
  pub correct_answer: String,
  pub base_points: u32,
  pub time_limit_secs: u32,
  pub category_id: String,
  pub difficulty: Difficulty,
  pub source: PuzzleSource,
}

/// A puzzle category. Only active categories participate in quest generation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
  pub id: String,
  pub name: String,
  pub is_active: bool,
}

/// Progression-relevant slice of a user. `level` is derived from `xp` and is
/// only ever written by the progression ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserProfile {
  pub id: String,
  pub username: String,
  pub xp: u64,
  pub level: u32,
  pub puzzles_completed: u64,
  pub tokens: u64,
  pub difficulty_tier: Difficulty,
}

/// One row per answer attempt. Created on submission, never mutated.
#[derive(Clone, Debug, Serialize)]
pub struct ProgressRecord {
  pub id: String,
  pub user_id: String,
  pub puzzle_id: String,
  pub category_id: String,
  pub is_correct: bool,
  pub submitted_answer: String,
  pub points_earned: u32,
  pub time_spent_secs: u32,
  pub attempted_at: DateTime<Utc>,
  pub daily_quest_id: Option<String>,
}

/// At most one per user. `longest_streak >= current_streak` at all times and
/// `last_milestone_reached` never decreases.
#[derive(Clone, Debug, Serialize)]
pub struct StreakRecord {
  pub user_id: String,
  pub current_streak: u32,
  pub longest_streak: u32,
  pub last_active_date: NaiveDate,
  pub last_milestone_reached: Option<u32>,
  pub streak_dates: Vec<String>,
}

/// Immutable membership row created together with its quest.
#[derive(Clone, Debug, Serialize)]
pub struct DailyQuestPuzzle {
  pub puzzle_id: String,
  pub order_index: u32,
}

/// At most one per (user, quest date). `completed_at` is set exactly once.
#[derive(Clone, Debug, Serialize)]
pub struct DailyQuest {
  pub id: String,
  pub user_id: String,
  pub quest_date: NaiveDate,
  pub total_questions: u32,
  pub completed_questions: u32,
  pub is_completed: bool,
  pub points_earned: u32,
  pub created_at: DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
  pub puzzles: Vec<DailyQuestPuzzle>,
}

/// A streak-count threshold paying a one-time bonus reward the first time it
/// is crossed.
#[derive(Clone, Copy, Debug)]
pub struct Milestone {
  pub days: u32,
  pub xp: u64,
  pub tokens: u64,
  pub description: &'static str,
}

/// Fixed, ascending milestone table. At most one entry is awarded per streak
/// update: the largest crossed threshold above the user's watermark.
pub const STREAK_MILESTONES: [Milestone; 6] = [
  Milestone { days: 3, xp: 50, tokens: 5, description: "3-Day Streak" },
  Milestone { days: 7, xp: 150, tokens: 15, description: "7-Day Streak" },
  Milestone { days: 14, xp: 300, tokens: 30, description: "14-Day Streak" },
  Milestone { days: 30, xp: 600, tokens: 60, description: "30-Day Streak" },
  Milestone { days: 60, xp: 1200, tokens: 120, description: "60-Day Streak" },
  Milestone { days: 100, xp: 2000, tokens: 200, description: "100-Day Streak" },
];
