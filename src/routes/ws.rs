//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument};

use crate::error::AppError;
use crate::protocol::*;
use crate::state::AppState;
use crate::{logic, quest, streak};

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "mindrush_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "mindrush_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => handle_client_ws(incoming, &state).await,
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e), retryable: false },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "mindrush_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "mindrush_backend", "WebSocket disconnected");
}

fn error_reply(e: AppError) -> ServerWsMessage {
  ServerWsMessage::Error { message: e.to_string(), retryable: e.is_retryable() }
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::SubmitAnswer { user_id, puzzle_id, answer, time_spent_secs, skipped, timezone } => {
      match logic::submit_answer(state, &user_id, &puzzle_id, &answer, time_spent_secs, skipped, timezone.as_deref()).await {
        Ok(outcome) => {
          tracing::info!(target: "scoring", user = %user_id, puzzle = %puzzle_id, correct = outcome.is_correct, "WS submit_answer evaluated");
          ServerWsMessage::AnswerResult { result: to_answer_out(outcome) }
        }
        Err(e) => error_reply(e),
      }
    }

    ClientWsMessage::DailyQuest { user_id, timezone } => {
      match quest::get_or_create_todays_quest(state, &user_id, timezone.as_deref()).await {
        Ok(detail) => {
          tracing::info!(target: "quest", user = %user_id, quest_id = %detail.quest.id, "WS quest served");
          ServerWsMessage::Quest { quest: to_quest_out(&detail) }
        }
        Err(e) => error_reply(e),
      }
    }

    ClientWsMessage::QuestStatus { user_id, timezone } => {
      match quest::todays_quest_status(state, &user_id, timezone.as_deref()).await {
        Ok((date, quest_row)) => ServerWsMessage::QuestStatus { status: to_quest_status_out(date, quest_row.as_ref()) },
        Err(e) => error_reply(e),
      }
    }

    ClientWsMessage::CompleteQuest { user_id, timezone } => {
      match quest::complete_quest_if_eligible(state, &user_id, timezone.as_deref()).await {
        Ok(outcome) => ServerWsMessage::QuestCompleted { result: to_complete_out(&outcome) },
        Err(e) => error_reply(e),
      }
    }

    ClientWsMessage::UpdateStreak { user_id, timezone } => {
      match streak::update_streak(state, &user_id, timezone.as_deref()).await {
        Ok(rec) => ServerWsMessage::Streak { streak: to_streak_out(&rec) },
        Err(e) => error_reply(e),
      }
    }

    ClientWsMessage::GetStreak { user_id } => {
      let streak_out = match streak::get_streak(state, &user_id).await {
        Some(rec) => to_streak_out(&rec),
        None => empty_streak_out(),
      };
      ServerWsMessage::Streak { streak: streak_out }
    }
  }
}
