//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This is the answer-submission pipeline:
//!   - Validate puzzle and user, apply the replay-window guard
//!   - Score the answer (pure)
//!   - Persist the attempt record, then the ledger update
//!   - Advance today's quest and auto-attempt its completion when full
//!   - Run the streak update as a post-commit hook on correct answers
//!
//! The attempt record is written before the ledger so a retried ledger
//! update can re-derive its points from the persisted record instead of
//! re-scoring.

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::ProgressRecord;
use crate::error::AppError;
use crate::progression;
use crate::quest;
use crate::scoring;
use crate::state::AppState;
use crate::streak;
use crate::util::{resolve_timezone, today_in};

/// What the submitter gets back: the verdict plus their updated totals.
#[derive(Clone, Copy, Debug)]
pub struct SubmissionOutcome {
  pub is_correct: bool,
  pub points_earned: u32,
  pub new_xp: u64,
  pub new_level: u32,
  pub puzzles_completed: u64,
}

#[instrument(level = "info", skip(state, answer), fields(%user_id, %puzzle_id, answer_len = answer.len()))]
pub async fn submit_answer(
  state: &AppState,
  user_id: &str,
  puzzle_id: &str,
  answer: &str,
  elapsed_secs: u32,
  skipped: bool,
  timezone: Option<&str>,
) -> Result<SubmissionOutcome, AppError> {
  let puzzle = state
    .puzzles
    .get(puzzle_id)
    .await
    .ok_or_else(|| AppError::not_found("puzzle", puzzle_id))?;
  if state.users.get(user_id).await.is_none() {
    return Err(AppError::not_found("user", user_id));
  }

  progression::check_replay_window(
    &state.progress,
    user_id,
    puzzle_id,
    state.config.tuning.replay_window_secs,
  )
  .await?;

  let score = scoring::score_submission(&puzzle, answer, elapsed_secs, skipped)?;

  // Resolve quest membership before the record insert so the first-correct
  // check cannot be confused by the record we are about to write.
  let tz = resolve_timezone(timezone)?;
  let today = today_in(tz);
  let membership =
    quest::open_quest_membership(state, user_id, puzzle_id, today, score.is_correct).await;

  let record = ProgressRecord {
    id: Uuid::new_v4().to_string(),
    user_id: user_id.to_string(),
    puzzle_id: puzzle_id.to_string(),
    category_id: puzzle.category_id.clone(),
    is_correct: score.is_correct,
    submitted_answer: answer.trim().to_string(),
    points_earned: score.points_earned,
    time_spent_secs: elapsed_secs,
    attempted_at: Utc::now(),
    daily_quest_id: membership.as_ref().map(|m| m.quest_id.clone()),
  };
  state.progress.insert(record).await;

  let ledger = if score.is_correct {
    progression::apply_correct_answer(&state.users, user_id, score.points_earned).await?
  } else {
    progression::current_totals(&state.users, user_id).await?
  };

  if let Some(m) = membership.filter(|m| m.counts) {
    match quest::record_quest_progress(state, user_id, today).await {
      Ok(q) => {
        info!(target: "quest", %user_id, quest_id = %m.quest_id, progress = %format!("{}/{}", q.completed_questions, q.total_questions), "quest progress advanced");
        if q.completed_questions == q.total_questions && !q.is_completed {
          // Auto-attempt completion; a concurrent completer or a lock
          // timeout is not the submitter's failure.
          if let Err(e) = quest::complete_quest_if_eligible(state, user_id, timezone).await {
            warn!(target: "quest", %user_id, error = %e, "auto-completion attempt did not complete the quest");
          }
        }
      }
      Err(e) => {
        warn!(target: "quest", %user_id, error = %e, "could not advance quest progress");
      }
    }
  }

  // Post-commit hook: correct answers count toward today's streak. Same-day
  // repeats are no-ops inside the state machine, and a failure here never
  // fails the submission.
  if score.is_correct {
    if let Err(e) = streak::update_streak(state, user_id, timezone).await {
      warn!(target: "streak", %user_id, error = %e, "streak update after submission failed");
    }
  }

  info!(target: "scoring", %user_id, %puzzle_id, correct = score.is_correct, points = score.points_earned, "submission evaluated");
  Ok(SubmissionOutcome {
    is_correct: score.is_correct,
    points_earned: score.points_earned,
    new_xp: ledger.new_xp,
    new_level: ledger.new_level,
    puzzles_completed: ledger.puzzles_completed,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::progression::level_for_xp;

  #[tokio::test]
  async fn correct_answer_updates_ledger_and_seeds_streak() {
    let state = AppState::for_tests();
    let out = submit_answer(&state, "u-demo", "p101", "A piano", 30, false, None)
      .await
      .unwrap();
    assert!(out.is_correct);
    assert_eq!(out.points_earned, 120);
    assert_eq!(out.new_xp, 120);
    assert_eq!(out.new_level, level_for_xp(120));
    assert_eq!(out.puzzles_completed, 1);

    let streak = state.streaks.get("u-demo").await.unwrap();
    assert_eq!(streak.current_streak, 1);
  }

  #[tokio::test]
  async fn incorrect_answer_changes_nothing() {
    let state = AppState::for_tests();
    let out = submit_answer(&state, "u-demo", "p101", "A map", 30, false, None)
      .await
      .unwrap();
    assert!(!out.is_correct);
    assert_eq!(out.points_earned, 0);
    assert_eq!(out.new_xp, 0);
    assert_eq!(out.puzzles_completed, 0);
    assert!(state.streaks.get("u-demo").await.is_none());
  }

  #[tokio::test]
  async fn immediate_resubmission_is_rejected() {
    let state = AppState::for_tests();
    submit_answer(&state, "u-demo", "p101", "A piano", 30, false, None)
      .await
      .unwrap();
    let err = submit_answer(&state, "u-demo", "p101", "A piano", 30, false, None)
      .await
      .unwrap_err();
    assert!(matches!(err, AppError::DuplicateSubmission { .. }));
    // The ledger only moved once.
    assert_eq!(state.users.get("u-demo").await.unwrap().xp, 120);
  }

  #[tokio::test]
  async fn unknown_puzzle_and_user_are_not_found() {
    let state = AppState::for_tests();
    assert!(matches!(
      submit_answer(&state, "u-demo", "p999", "x", 10, false, None).await,
      Err(AppError::NotFound { .. })
    ));
    assert!(matches!(
      submit_answer(&state, "ghost", "p101", "x", 10, false, None).await,
      Err(AppError::NotFound { .. })
    ));
  }

  #[tokio::test]
  async fn answering_every_quest_puzzle_completes_the_quest() {
    let state = AppState::for_tests();
    let detail = quest::get_or_create_todays_quest(&state, "u-demo", None).await.unwrap();

    let mut earned: u64 = 0;
    for (p, _) in &detail.puzzles {
      let out = submit_answer(
        &state,
        "u-demo",
        &p.id,
        &p.correct_answer,
        p.time_limit_secs,
        false,
        None,
      )
      .await
      .unwrap();
      assert!(out.is_correct);
      earned += out.points_earned as u64;
    }

    let (_, quest_row) = quest::todays_quest_status(&state, "u-demo", None).await.unwrap();
    let quest_row = quest_row.unwrap();
    assert!(quest_row.is_completed);
    assert_eq!(quest_row.completed_questions, quest_row.total_questions);
    assert!(quest_row.completed_at.is_some());

    // Answer points plus the completion bonus, paid exactly once.
    let user = state.users.get("u-demo").await.unwrap();
    assert_eq!(user.xp, earned + 100);
    assert_eq!(user.level, level_for_xp(user.xp));

    // The explicit endpoint after auto-completion reports already-completed
    // with the same payload and no second payout.
    let repeat = quest::complete_quest_if_eligible(&state, "u-demo", None).await.unwrap();
    assert!(repeat.already_completed);
    assert_eq!(state.users.get("u-demo").await.unwrap().xp, earned + 100);
  }

  #[tokio::test]
  async fn repeat_correct_answer_does_not_double_count_quest_progress() {
    // Replay window off so the second submission is actually accepted.
    let mut cfg = crate::config::GameConfig::default();
    cfg.tuning.replay_window_secs = 0;
    let state = AppState::with_config(cfg);

    let detail = quest::get_or_create_todays_quest(&state, "u-demo", None).await.unwrap();
    let (p, _) = &detail.puzzles[0];

    for _ in 0..2 {
      let out = submit_answer(&state, "u-demo", &p.id, &p.correct_answer, 10, false, None)
        .await
        .unwrap();
      assert!(out.is_correct);
    }

    // The ledger counts both correct answers; the quest counter only one.
    let (_, quest_row) = quest::todays_quest_status(&state, "u-demo", None).await.unwrap();
    assert_eq!(quest_row.unwrap().completed_questions, 1);
    assert_eq!(state.users.get("u-demo").await.unwrap().puzzles_completed, 2);
  }
}
