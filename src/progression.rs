//! Submission guard and progression ledger.
//!
//! The guard rejects repeat submissions for the same (user, puzzle) inside
//! the replay window. It is a best-effort anti-double-click measure, not an
//! exactly-once guarantee; the quest completion lock is what closes the
//! double-payment race.
//!
//! The ledger is the only writer of xp/level/puzzles_completed/tokens.
//! Level is always recomputed from the new xp total, never stored
//! independently, so the two cannot desynchronize.

use chrono::{Duration, Utc};
use tracing::{debug, instrument};

use crate::error::AppError;
use crate::store::{ProgressStore, UserStore};

/// The single canonical level curve: level = floor(sqrt(xp / 100)) + 1.
/// Level 1 = 0–99 XP, level 2 = 100–399, level 3 = 400–899, ...
pub fn level_for_xp(xp: u64) -> u32 {
  ((xp as f64 / 100.0).sqrt().floor() as u32) + 1
}

/// Snapshot of the progression fields after a ledger write.
#[derive(Clone, Copy, Debug)]
pub struct LedgerUpdate {
  pub new_xp: u64,
  pub new_level: u32,
  pub puzzles_completed: u64,
  pub tokens: u64,
}

/// Reject a submission for (user, puzzle) whose previous attempt is younger
/// than the replay window.
#[instrument(level = "debug", skip(progress), fields(%user_id, %puzzle_id))]
pub async fn check_replay_window(
  progress: &ProgressStore,
  user_id: &str,
  puzzle_id: &str,
  window_secs: i64,
) -> Result<(), AppError> {
  if let Some(at) = progress.latest_attempt_at(user_id, puzzle_id).await {
    let age = Utc::now() - at;
    if age < Duration::seconds(window_secs) {
      debug!(target: "progression", %user_id, %puzzle_id, age_ms = age.num_milliseconds(), "submission inside replay window");
      return Err(AppError::DuplicateSubmission { puzzle_id: puzzle_id.to_string() });
    }
  }
  Ok(())
}

/// Apply a correct answer: xp grows by the earned points, the completed
/// count by one, and the level is rederived from the new total.
#[instrument(level = "debug", skip(users), fields(%user_id, points))]
pub async fn apply_correct_answer(
  users: &UserStore,
  user_id: &str,
  points: u32,
) -> Result<LedgerUpdate, AppError> {
  let user = users
    .update(user_id, |u| {
      u.xp += points as u64;
      u.puzzles_completed += 1;
      u.level = level_for_xp(u.xp);
    })
    .await?;
  debug!(target: "progression", %user_id, xp = user.xp, level = user.level, "ledger updated");
  Ok(snapshot_of(&user))
}

/// Pay a bonus (quest completion, streak milestone). Same level rule as the
/// answer path; tokens ride along.
#[instrument(level = "debug", skip(users), fields(%user_id, xp, tokens))]
pub async fn award_bonus(
  users: &UserStore,
  user_id: &str,
  xp: u64,
  tokens: u64,
) -> Result<LedgerUpdate, AppError> {
  let user = users
    .update(user_id, |u| {
      u.xp += xp;
      u.tokens += tokens;
      u.level = level_for_xp(u.xp);
    })
    .await?;
  debug!(target: "progression", %user_id, xp = user.xp, level = user.level, tokens = user.tokens, "bonus paid");
  Ok(snapshot_of(&user))
}

/// Current ledger state without any mutation; used for incorrect answers so
/// the response still carries the user's totals.
pub async fn current_totals(users: &UserStore, user_id: &str) -> Result<LedgerUpdate, AppError> {
  let user = users
    .get(user_id)
    .await
    .ok_or_else(|| AppError::not_found("user", user_id))?;
  Ok(snapshot_of(&user))
}

fn snapshot_of(user: &crate::domain::UserProfile) -> LedgerUpdate {
  LedgerUpdate {
    new_xp: user.xp,
    new_level: user.level,
    puzzles_completed: user.puzzles_completed,
    tokens: user.tokens,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Difficulty, ProgressRecord, UserProfile};

  fn user(id: &str) -> UserProfile {
    UserProfile {
      id: id.into(),
      username: id.into(),
      xp: 0,
      level: 1,
      puzzles_completed: 0,
      tokens: 0,
      difficulty_tier: Difficulty::Beginner,
    }
  }

  #[test]
  fn level_curve_breakpoints() {
    assert_eq!(level_for_xp(0), 1);
    assert_eq!(level_for_xp(99), 1);
    assert_eq!(level_for_xp(100), 2);
    assert_eq!(level_for_xp(399), 2);
    assert_eq!(level_for_xp(400), 3);
    assert_eq!(level_for_xp(900), 4);
  }

  #[tokio::test]
  async fn correct_answer_moves_xp_level_and_count_together() {
    let users = UserStore::preloaded(vec![user("u1")]);

    let up = apply_correct_answer(&users, "u1", 120).await.unwrap();
    assert_eq!(up.new_xp, 120);
    assert_eq!(up.new_level, 2);
    assert_eq!(up.puzzles_completed, 1);

    let stored = users.get("u1").await.unwrap();
    assert_eq!(stored.level, level_for_xp(stored.xp));
  }

  #[tokio::test]
  async fn bonus_pays_xp_and_tokens_with_same_level_rule() {
    let users = UserStore::preloaded(vec![user("u1")]);

    let up = award_bonus(&users, "u1", 400, 30).await.unwrap();
    assert_eq!(up.new_xp, 400);
    assert_eq!(up.new_level, 3);
    assert_eq!(up.tokens, 30);
    assert_eq!(up.puzzles_completed, 0);
  }

  #[tokio::test]
  async fn ledger_rejects_unknown_users() {
    let users = UserStore::preloaded(Vec::new());
    assert!(matches!(
      apply_correct_answer(&users, "ghost", 10).await,
      Err(AppError::NotFound { .. })
    ));
  }

  #[tokio::test]
  async fn replay_window_rejects_fresh_repeat() {
    let progress = ProgressStore::default();
    progress
      .insert(ProgressRecord {
        id: "r1".into(),
        user_id: "u1".into(),
        puzzle_id: "p1".into(),
        category_id: "c1".into(),
        is_correct: false,
        submitted_answer: "x".into(),
        points_earned: 0,
        time_spent_secs: 3,
        attempted_at: Utc::now(),
        daily_quest_id: None,
      })
      .await;

    assert!(matches!(
      check_replay_window(&progress, "u1", "p1", 5).await,
      Err(AppError::DuplicateSubmission { .. })
    ));
    // A different puzzle for the same user is unaffected.
    assert!(check_replay_window(&progress, "u1", "p2", 5).await.is_ok());
  }

  #[tokio::test]
  async fn replay_window_expires() {
    let progress = ProgressStore::default();
    progress
      .insert(ProgressRecord {
        id: "r1".into(),
        user_id: "u1".into(),
        puzzle_id: "p1".into(),
        category_id: "c1".into(),
        is_correct: true,
        submitted_answer: "x".into(),
        points_earned: 10,
        time_spent_secs: 3,
        attempted_at: Utc::now() - Duration::seconds(6),
        daily_quest_id: None,
      })
      .await;

    assert!(check_replay_window(&progress, "u1", "p1", 5).await.is_ok());
  }
}
