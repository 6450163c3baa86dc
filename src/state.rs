//! Application state: in-memory stores, event bus, and content loading.
//!
//! This module owns:
//!   - the puzzle/category/user stores and their seed+config merge policy
//!   - the progress, streak, and quest stores
//!   - the event bus handed to the progression components
//!
//! Content policy: config-bank entries are inserted first, then built-in
//! seeds; ids already present are never overwritten, so a bank entry can
//! shadow a seed but not the other way around.

use std::collections::HashMap;

use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::config::{load_game_config_from_env, GameConfig};
use crate::domain::{Category, Difficulty, Puzzle, PuzzleSource, UserProfile};
use crate::events::EventBus;
use crate::seeds::{seed_categories, seed_puzzles, seed_users};
use crate::store::{CategoryStore, ProgressStore, PuzzleStore, QuestStore, StreakStore, UserStore};

const EVENT_BUS_CAPACITY: usize = 64;

pub struct AppState {
    pub config: GameConfig,
    pub puzzles: PuzzleStore,
    pub categories: CategoryStore,
    pub users: UserStore,
    pub progress: ProgressStore,
    pub streaks: StreakStore,
    pub quests: QuestStore,
    pub bus: EventBus,
}

impl AppState {
    /// Build state from env: load config if provided, merge content, wire
    /// the bus.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_game_config_from_env().unwrap_or_default();
        Self::with_config(config)
    }

    pub fn with_config(config: GameConfig) -> Self {
        // Bank entries first, then built-in seeds; `preloaded` keeps the
        // first occurrence of each id.
        let mut puzzles: Vec<Puzzle> = Vec::new();
        for pc in &config.puzzles {
            if pc.time_limit_secs == 0 {
                // A zero limit would poison scoring later; refuse the entry now.
                error!(target: "mindrush_backend", question = %pc.question, "Skipping bank puzzle: non-positive time limit.");
                continue;
            }
            puzzles.push(Puzzle {
                id: pc.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string()),
                question: pc.question.clone(),
                options: pc.options.clone(),
                correct_answer: pc.correct_answer.clone(),
                base_points: pc.base_points,
                time_limit_secs: pc.time_limit_secs,
                category_id: pc.category_id.clone(),
                difficulty: pc.difficulty,
                source: PuzzleSource::LocalBank,
            });
        }
        puzzles.extend(seed_puzzles());

        // Inventory summary by difficulty/source.
        let mut count_by_diff: HashMap<Difficulty, (usize, usize)> = HashMap::new();
        for p in &puzzles {
            let entry = count_by_diff.entry(p.difficulty).or_insert((0, 0));
            match p.source {
                PuzzleSource::LocalBank => entry.0 += 1,
                PuzzleSource::Seed => entry.1 += 1,
            }
        }
        for (diff, (bank, seed)) in count_by_diff {
            info!(target: "mindrush_backend", ?diff, local_bank = bank, seed = seed, "Startup puzzle inventory");
        }

        let mut categories: Vec<Category> = config
            .categories
            .iter()
            .map(|cc| Category {
                id: cc.id.clone(),
                name: cc.name.clone(),
                is_active: cc.is_active,
            })
            .collect();
        categories.extend(seed_categories());

        let mut users: Vec<UserProfile> = config
            .users
            .iter()
            .map(|uc| UserProfile {
                id: uc.id.clone(),
                username: uc.username.clone().unwrap_or_else(|| uc.id.clone()),
                xp: 0,
                level: 1,
                puzzles_completed: 0,
                tokens: 0,
                difficulty_tier: uc.difficulty_tier,
            })
            .collect();
        users.extend(seed_users());

        Self {
            puzzles: PuzzleStore::preloaded(puzzles),
            categories: CategoryStore::preloaded(categories),
            users: UserStore::preloaded(users),
            progress: ProgressStore::default(),
            streaks: StreakStore::default(),
            quests: QuestStore::default(),
            bus: EventBus::new(EVENT_BUS_CAPACITY),
            config,
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::with_config(GameConfig::default())
    }
}
