//! Daily quest lifecycle: generation, progress tracking, and the guarded
//! completion transaction.
//!
//! Generation is idempotent by construction (uniqueness on user + quest
//! date, losers of the race read the surviving row). Completion holds the
//! quest's exclusive lock across its re-check and writes; the re-check is
//! what prevents a double bonus payment when two "last answer" requests
//! race, not the submission guard.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rand::seq::SliceRandom;
use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{DailyQuest, DailyQuestPuzzle, Puzzle, StreakRecord};
use crate::error::AppError;
use crate::events::TOPIC_QUEST_COMPLETED;
use crate::progression;
use crate::state::AppState;
use crate::streak;
use crate::util::{resolve_timezone, today_in};

/// A quest joined with its puzzles and per-puzzle completion flags, in draw
/// order.
#[derive(Clone, Debug)]
pub struct QuestDetail {
  pub quest: DailyQuest,
  pub puzzles: Vec<(Puzzle, bool)>,
}

/// Result of the completion transaction. Repeat calls after a successful
/// completion return the original payload with `already_completed` set.
#[derive(Clone, Debug)]
pub struct CompletionOutcome {
  pub already_completed: bool,
  pub bonus_xp: u32,
  pub total_points: u32,
  pub completed_at: DateTime<Utc>,
  pub streak: Option<StreakRecord>,
}

/// How a submitted puzzle relates to today's quest.
#[derive(Clone, Debug)]
pub struct QuestMembership {
  pub quest_id: String,
  /// True when this submission should advance the quest counter: correct,
  /// quest still open, and this quest puzzle not already answered correctly.
  pub counts: bool,
}

/// Serve today's quest, generating it on first read of the day.
#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn get_or_create_todays_quest(
  state: &AppState,
  user_id: &str,
  timezone: Option<&str>,
) -> Result<QuestDetail, AppError> {
  let tz = resolve_timezone(timezone)?;
  let today = today_in(tz);

  if let Some(existing) = state.quests.get(user_id, today).await {
    return build_detail(state, existing).await;
  }

  let user = state
    .users
    .get(user_id)
    .await
    .ok_or_else(|| AppError::not_found("user", user_id))?;

  let active = state.categories.active_ids().await;
  if active.is_empty() {
    return Err(AppError::Configuration(
      "no active categories available for quest generation".into(),
    ));
  }

  let mut pool = state.puzzles.list_matching(user.difficulty_tier, &active).await;
  if pool.is_empty() {
    return Err(AppError::Configuration(format!(
      "no puzzles available for tier {:?}",
      user.difficulty_tier
    )));
  }

  // Random draw without replacement.
  {
    let mut rng = rand::thread_rng();
    pool.shuffle(&mut rng);
  }
  let size = state.config.tuning.quest_size;
  if pool.len() < size {
    warn!(target: "quest", %user_id, found = pool.len(), wanted = size, "fewer puzzles than quest size; creating a smaller quest");
  }
  pool.truncate(size);

  let quest = DailyQuest {
    id: Uuid::new_v4().to_string(),
    user_id: user_id.to_string(),
    quest_date: today,
    total_questions: pool.len() as u32,
    completed_questions: 0,
    is_completed: false,
    points_earned: 0,
    created_at: Utc::now(),
    completed_at: None,
    puzzles: pool
      .iter()
      .enumerate()
      .map(|(i, p)| DailyQuestPuzzle { puzzle_id: p.id.clone(), order_index: i as u32 })
      .collect(),
  };

  let (quest, created) = state.quests.insert_or_existing(quest).await;
  if created {
    info!(target: "quest", %user_id, quest_id = %quest.id, date = %quest.quest_date, questions = quest.total_questions, "daily quest generated");
  } else {
    debug!(target: "quest", %user_id, quest_id = %quest.id, "lost generation race; serving existing quest");
  }
  build_detail(state, quest).await
}

/// Lightweight status read; never generates.
pub async fn todays_quest_status(
  state: &AppState,
  user_id: &str,
  timezone: Option<&str>,
) -> Result<(NaiveDate, Option<DailyQuest>), AppError> {
  let tz = resolve_timezone(timezone)?;
  let today = today_in(tz);
  Ok((today, state.quests.get(user_id, today).await))
}

/// Resolve whether `puzzle_id` belongs to today's quest and whether a
/// correct submission for it should advance the counter. Looked up before
/// the progress record is written so the first-correct check cannot see the
/// record it is guarding against.
pub async fn open_quest_membership(
  state: &AppState,
  user_id: &str,
  puzzle_id: &str,
  today: NaiveDate,
  is_correct: bool,
) -> Option<QuestMembership> {
  let quest = state.quests.get(user_id, today).await?;
  if !quest.puzzles.iter().any(|qp| qp.puzzle_id == puzzle_id) {
    return None;
  }
  let counts = is_correct
    && !quest.is_completed
    && !state.progress.has_correct_quest_answer(&quest.id, puzzle_id).await;
  Some(QuestMembership { quest_id: quest.id, counts })
}

/// Advance the quest counter for one newly answered quest puzzle.
pub async fn record_quest_progress(
  state: &AppState,
  user_id: &str,
  today: NaiveDate,
) -> Result<DailyQuest, AppError> {
  state
    .quests
    .update(user_id, today, |q| {
      q.completed_questions = (q.completed_questions + 1).min(q.total_questions);
    })
    .await
}

/// The completion transaction: lock, re-check, mutate, pay, then the
/// post-commit streak update outside the lock.
#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn complete_quest_if_eligible(
  state: &AppState,
  user_id: &str,
  timezone: Option<&str>,
) -> Result<CompletionOutcome, AppError> {
  let tz = resolve_timezone(timezone)?;
  let today = today_in(tz);
  let bonus_xp = state.config.tuning.quest_bonus_xp;

  // Completion never generates; no quest today is a NotFound.
  let quest = state
    .quests
    .get(user_id, today)
    .await
    .ok_or_else(|| AppError::not_found("daily quest", format!("{user_id}@{today}")))?;

  let lock = state.quests.completion_lock(&quest.id).await;
  let wait = Duration::from_millis(state.config.tuning.completion_lock_wait_ms);
  let guard = timeout(wait, lock.lock_owned())
    .await
    .map_err(|_| AppError::ContentionTimeout { waited_ms: wait.as_millis() as u64 })?;

  // Re-read under the lock; a concurrent completer may already have won.
  let quest = state
    .quests
    .get(user_id, today)
    .await
    .ok_or_else(|| AppError::not_found("daily quest", format!("{user_id}@{today}")))?;

  if quest.is_completed {
    debug!(target: "quest", %user_id, quest_id = %quest.id, "quest already completed; returning original result");
    let streak = state.streaks.get(user_id).await;
    return Ok(CompletionOutcome {
      already_completed: true,
      bonus_xp,
      total_points: quest.points_earned,
      completed_at: quest.completed_at.unwrap_or_else(Utc::now),
      streak,
    });
  }

  if quest.completed_questions != quest.total_questions {
    return Err(AppError::InvalidState(format!(
      "quest not fully answered: {}/{}",
      quest.completed_questions, quest.total_questions
    )));
  }

  // The user row must exist before the quest row is touched.
  if state.users.get(user_id).await.is_none() {
    return Err(AppError::not_found("user", user_id));
  }

  let completed_at = Utc::now();
  let quest = state
    .quests
    .update(user_id, today, |q| {
      q.is_completed = true;
      q.completed_at = Some(completed_at);
      q.points_earned += bonus_xp;
    })
    .await?;
  let ledger = progression::award_bonus(&state.users, user_id, bonus_xp as u64, 0).await?;
  info!(target: "quest", %user_id, quest_id = %quest.id, bonus_xp, new_xp = ledger.new_xp, new_level = ledger.new_level, "daily quest completed");
  drop(guard);

  // Post-commit hook: the quest stays completed even if the streak update
  // fails; the miss is logged and shows up as an absent streak view.
  let streak = match streak::update_streak(state, user_id, timezone).await {
    Ok(s) => Some(s),
    Err(e) => {
      error!(target: "quest", %user_id, error = %e, "post-completion streak update failed; quest completion stands");
      None
    }
  };

  state.bus.emit(
    TOPIC_QUEST_COMPLETED,
    json!({
      "userId": user_id,
      "questId": quest.id,
      "questDate": quest.quest_date.to_string(),
      "bonusXp": bonus_xp,
    }),
  );

  Ok(CompletionOutcome {
    already_completed: false,
    bonus_xp,
    total_points: quest.points_earned,
    completed_at,
    streak,
  })
}

async fn build_detail(state: &AppState, quest: DailyQuest) -> Result<QuestDetail, AppError> {
  let done = state.progress.completed_puzzle_ids(&quest.id).await;
  let mut puzzles = Vec::with_capacity(quest.puzzles.len());
  for qp in &quest.puzzles {
    let p = state.puzzles.get(&qp.puzzle_id).await.ok_or_else(|| {
      AppError::Configuration(format!(
        "quest {} references missing puzzle {}",
        quest.id, qp.puzzle_id
      ))
    })?;
    let completed = done.contains(&qp.puzzle_id);
    puzzles.push((p, completed));
  }
  Ok(QuestDetail { quest, puzzles })
}
