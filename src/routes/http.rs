//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs include parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::protocol::*;
use crate::state::AppState;
use crate::{logic, quest, streak};

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(%body.user_id, %body.puzzle_id, answer_len = body.answer.len()))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SubmitAnswerIn>,
) -> Result<Json<SubmitAnswerOut>, AppError> {
  let outcome = logic::submit_answer(
    &state,
    &body.user_id,
    &body.puzzle_id,
    &body.answer,
    body.time_spent_secs,
    body.skipped,
    body.timezone.as_deref(),
  )
  .await?;
  info!(target: "scoring", user = %body.user_id, puzzle = %body.puzzle_id, correct = outcome.is_correct, "HTTP submit_answer evaluated");
  Ok(Json(to_answer_out(outcome)))
}

#[instrument(level = "info", skip(state), fields(%q.user_id))]
pub async fn http_get_quest(
  State(state): State<Arc<AppState>>,
  Query(q): Query<QuestQuery>,
) -> Result<Json<QuestOut>, AppError> {
  let detail = quest::get_or_create_todays_quest(&state, &q.user_id, q.timezone.as_deref()).await?;
  info!(target: "quest", user = %q.user_id, quest_id = %detail.quest.id, "HTTP quest served");
  Ok(Json(to_quest_out(&detail)))
}

#[instrument(level = "info", skip(state), fields(%q.user_id))]
pub async fn http_get_quest_status(
  State(state): State<Arc<AppState>>,
  Query(q): Query<QuestQuery>,
) -> Result<Json<QuestStatusOut>, AppError> {
  let (date, quest_row) = quest::todays_quest_status(&state, &q.user_id, q.timezone.as_deref()).await?;
  Ok(Json(to_quest_status_out(date, quest_row.as_ref())))
}

#[instrument(level = "info", skip(state, body), fields(%body.user_id))]
pub async fn http_post_complete_quest(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CompleteQuestIn>,
) -> Result<Json<CompleteQuestOut>, AppError> {
  let outcome = quest::complete_quest_if_eligible(&state, &body.user_id, body.timezone.as_deref()).await?;
  info!(target: "quest", user = %body.user_id, already = outcome.already_completed, "HTTP quest completion handled");
  Ok(Json(to_complete_out(&outcome)))
}

#[instrument(level = "info", skip(state, body), fields(%body.user_id))]
pub async fn http_post_update_streak(
  State(state): State<Arc<AppState>>,
  Json(body): Json<UpdateStreakIn>,
) -> Result<Json<StreakOut>, AppError> {
  let rec = streak::update_streak(&state, &body.user_id, body.timezone.as_deref()).await?;
  info!(target: "streak", user = %body.user_id, streak = rec.current_streak, "HTTP streak updated");
  Ok(Json(to_streak_out(&rec)))
}

#[instrument(level = "info", skip(state), fields(%q.user_id))]
pub async fn http_get_streak(
  State(state): State<Arc<AppState>>,
  Query(q): Query<StreakQuery>,
) -> Result<Json<StreakOut>, AppError> {
  let out = match streak::get_streak(&state, &q.user_id).await {
    Some(rec) => to_streak_out(&rec),
    None => empty_streak_out(),
  };
  Ok(Json(out))
}
