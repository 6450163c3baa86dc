//! In-process event bus with fire-and-forget delivery.
//!
//! Emitters never fail and never wait on subscribers; a lagging or absent
//! subscriber cannot roll back the state change that produced the event.
//! Subscribers that need stronger guarantees are expected to re-read store
//! state (at-least-once semantics).

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};

pub const TOPIC_PUZZLE_SOLVED: &str = "streak.puzzle.solved";
pub const TOPIC_MILESTONE_REACHED: &str = "streak.milestone.reached";
pub const TOPIC_QUEST_COMPLETED: &str = "quest.completed";

#[derive(Clone, Debug)]
pub struct Event {
    pub topic: &'static str,
    pub payload: Value,
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Returns how many subscribers received it; zero is
    /// not an error.
    pub fn emit(&self, topic: &'static str, payload: Value) -> usize {
        let delivered = self.tx.send(Event { topic, payload }).unwrap_or(0);
        debug!(target: "mindrush_backend", topic, delivered, "event emitted");
        delivered
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

/// Spawn a task that logs every bus event. Doubles as a liveness check for
/// delivery during development.
pub fn spawn_event_logger(bus: &EventBus) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    info!(target: "mindrush_backend", topic = ev.topic, payload = %ev.payload, "event");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(target: "mindrush_backend", skipped, "event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
