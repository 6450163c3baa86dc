//! Mindrush · Puzzle Progression Backend
//!
//! - Axum HTTP + WebSocket API
//! - XP/level progression, daily streaks, and daily quests
//! - In-memory stores seeded from TOML config or built-in content
//!
//! Important env variables:
//!   PORT          : u16 (default 3000)
//!   GAME_CONFIG_PATH  : path to TOML config (tuning + optional content bank)
//!   LOG_LEVEL    : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod seeds;
mod events;
mod store;
mod state;
mod protocol;
mod scoring;
mod progression;
mod streak;
mod quest;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (in-memory stores, event bus, content).
  let state = Arc::new(AppState::new());

  // Log every bus event at debug level; keeps delivery observable.
  events::spawn_event_logger(&state.bus);

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "mindrush_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
