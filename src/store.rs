//! In-memory stores owned by `AppState`.
//!
//! This module owns:
//!   - puzzle and category stores (by id, by difficulty)
//!   - user profiles, attempt records, streaks, and daily quests
//!
//! The two relational guarantees the progression engine leans on are explicit
//! primitives here: `QuestStore::insert_or_existing` (uniqueness on
//! (user, quest date) with fall-back to the surviving row) and
//! `QuestStore::completion_lock` (an exclusive per-quest lock the completion
//! transaction holds across its re-check and writes).

use std::collections::{hash_map::Entry, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::domain::{Category, DailyQuest, Difficulty, ProgressRecord, Puzzle, StreakRecord, UserProfile};
use crate::error::AppError;

#[derive(Default)]
pub struct PuzzleStore {
    by_id: RwLock<HashMap<String, Puzzle>>,
    by_diff: RwLock<HashMap<Difficulty, Vec<String>>>,
}

impl PuzzleStore {
    /// Build both indices up front; loaded once at startup, read-only after.
    /// Earlier entries win on id collisions, so bank content shadows seeds.
    pub fn preloaded(items: Vec<Puzzle>) -> Self {
        let mut by_id = HashMap::new();
        let mut by_diff: HashMap<Difficulty, Vec<String>> = HashMap::new();
        for p in items {
            if by_id.contains_key(&p.id) {
                continue;
            }
            by_diff.entry(p.difficulty).or_default().push(p.id.clone());
            by_id.insert(p.id.clone(), p);
        }
        Self { by_id: RwLock::new(by_id), by_diff: RwLock::new(by_diff) }
    }

    pub async fn get(&self, id: &str) -> Option<Puzzle> {
        self.by_id.read().await.get(id).cloned()
    }

    /// All puzzles of one difficulty whose category is in the given set.
    pub async fn list_matching(
        &self,
        difficulty: Difficulty,
        categories: &HashSet<String>,
    ) -> Vec<Puzzle> {
        let ids = match self.by_diff.read().await.get(&difficulty) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };
        let by_id = self.by_id.read().await;
        ids.iter()
            .filter_map(|id| by_id.get(id))
            .filter(|p| categories.contains(&p.category_id))
            .cloned()
            .collect()
    }
}

#[derive(Default)]
pub struct CategoryStore {
    by_id: RwLock<HashMap<String, Category>>,
}

impl CategoryStore {
    pub fn preloaded(items: Vec<Category>) -> Self {
        let mut by_id = HashMap::new();
        for c in items {
            by_id.entry(c.id.clone()).or_insert(c);
        }
        Self { by_id: RwLock::new(by_id) }
    }

    pub async fn active_ids(&self) -> HashSet<String> {
        self.by_id
            .read()
            .await
            .values()
            .filter(|c| c.is_active)
            .map(|c| c.id.clone())
            .collect()
    }
}

#[derive(Default)]
pub struct UserStore {
    by_id: RwLock<HashMap<String, UserProfile>>,
}

impl UserStore {
    pub fn preloaded(items: Vec<UserProfile>) -> Self {
        let mut by_id = HashMap::new();
        for u in items {
            by_id.entry(u.id.clone()).or_insert(u);
        }
        Self { by_id: RwLock::new(by_id) }
    }

    pub async fn get(&self, id: &str) -> Option<UserProfile> {
        self.by_id.read().await.get(id).cloned()
    }

    /// Read-modify-write under the store's write lock; the closure is the
    /// only place user progression fields may change.
    pub async fn update<F>(&self, id: &str, f: F) -> Result<UserProfile, AppError>
    where
        F: FnOnce(&mut UserProfile),
    {
        let mut map = self.by_id.write().await;
        let user = map
            .get_mut(id)
            .ok_or_else(|| AppError::not_found("user", id))?;
        f(user);
        Ok(user.clone())
    }
}

#[derive(Default)]
pub struct ProgressStore {
    by_user_puzzle: RwLock<HashMap<(String, String), Vec<ProgressRecord>>>,
    // quest id -> puzzle ids answered correctly for that quest
    correct_by_quest: RwLock<HashMap<String, HashSet<String>>>,
}

impl ProgressStore {
    /// Append-only insert; records are never mutated afterwards.
    pub async fn insert(&self, rec: ProgressRecord) {
        if rec.is_correct {
            if let Some(quest_id) = &rec.daily_quest_id {
                self.correct_by_quest
                    .write()
                    .await
                    .entry(quest_id.clone())
                    .or_default()
                    .insert(rec.puzzle_id.clone());
            }
        }
        self.by_user_puzzle
            .write()
            .await
            .entry((rec.user_id.clone(), rec.puzzle_id.clone()))
            .or_default()
            .push(rec);
    }

    /// Timestamp of the most recent attempt for (user, puzzle), if any.
    pub async fn latest_attempt_at(&self, user_id: &str, puzzle_id: &str) -> Option<DateTime<Utc>> {
        self.by_user_puzzle
            .read()
            .await
            .get(&(user_id.to_string(), puzzle_id.to_string()))
            .and_then(|v| v.iter().map(|r| r.attempted_at).max())
    }

    pub async fn has_correct_quest_answer(&self, quest_id: &str, puzzle_id: &str) -> bool {
        self.correct_by_quest
            .read()
            .await
            .get(quest_id)
            .map(|set| set.contains(puzzle_id))
            .unwrap_or(false)
    }

    pub async fn completed_puzzle_ids(&self, quest_id: &str) -> HashSet<String> {
        self.correct_by_quest
            .read()
            .await
            .get(quest_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Default)]
pub struct StreakStore {
    by_user: RwLock<HashMap<String, StreakRecord>>,
}

impl StreakStore {
    pub async fn get(&self, user_id: &str) -> Option<StreakRecord> {
        self.by_user.read().await.get(user_id).cloned()
    }

    pub async fn upsert(&self, rec: StreakRecord) {
        self.by_user.write().await.insert(rec.user_id.clone(), rec);
    }
}

#[derive(Default)]
pub struct QuestStore {
    by_user_date: RwLock<HashMap<(String, NaiveDate), DailyQuest>>,
    completion_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl QuestStore {
    /// Uniqueness on (user, quest date): the first writer wins, a concurrent
    /// second generation attempt gets the surviving row back instead of an
    /// error.
    pub async fn insert_or_existing(&self, quest: DailyQuest) -> (DailyQuest, bool) {
        let mut map = self.by_user_date.write().await;
        match map.entry((quest.user_id.clone(), quest.quest_date)) {
            Entry::Occupied(e) => (e.get().clone(), false),
            Entry::Vacant(v) => (v.insert(quest).clone(), true),
        }
    }

    pub async fn get(&self, user_id: &str, date: NaiveDate) -> Option<DailyQuest> {
        self.by_user_date
            .read()
            .await
            .get(&(user_id.to_string(), date))
            .cloned()
    }

    pub async fn update<F>(&self, user_id: &str, date: NaiveDate, f: F) -> Result<DailyQuest, AppError>
    where
        F: FnOnce(&mut DailyQuest),
    {
        let mut map = self.by_user_date.write().await;
        let quest = map
            .get_mut(&(user_id.to_string(), date))
            .ok_or_else(|| AppError::not_found("daily quest", user_id))?;
        f(quest);
        Ok(quest.clone())
    }

    /// The exclusive completion lock for one quest row, created on first use.
    /// Callers hold the guard across the completion re-check and writes,
    /// which serializes concurrent completers of the same quest.
    pub async fn completion_lock(&self, quest_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.completion_locks.lock().await;
        locks
            .entry(quest_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DailyQuestPuzzle;

    fn quest(user: &str, date: NaiveDate, id: &str) -> DailyQuest {
        DailyQuest {
            id: id.into(),
            user_id: user.into(),
            quest_date: date,
            total_questions: 1,
            completed_questions: 0,
            is_completed: false,
            points_earned: 0,
            created_at: Utc::now(),
            completed_at: None,
            puzzles: vec![DailyQuestPuzzle { puzzle_id: "p1".into(), order_index: 0 }],
        }
    }

    #[tokio::test]
    async fn quest_uniqueness_falls_back_to_existing_row() {
        let store = QuestStore::default();
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let (first, created) = store.insert_or_existing(quest("u1", date, "q-first")).await;
        assert!(created);
        let (second, created) = store.insert_or_existing(quest("u1", date, "q-second")).await;
        assert!(!created);
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn completion_lock_is_shared_per_quest() {
        let store = QuestStore::default();
        let a = store.completion_lock("q1").await;
        let b = store.completion_lock("q1").await;
        assert!(Arc::ptr_eq(&a, &b));
        let other = store.completion_lock("q2").await;
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[tokio::test]
    async fn progress_indexes_correct_quest_answers() {
        let store = ProgressStore::default();
        store
            .insert(ProgressRecord {
                id: "r1".into(),
                user_id: "u1".into(),
                puzzle_id: "p1".into(),
                category_id: "c1".into(),
                is_correct: true,
                submitted_answer: "a".into(),
                points_earned: 10,
                time_spent_secs: 5,
                attempted_at: Utc::now(),
                daily_quest_id: Some("q1".into()),
            })
            .await;
        assert!(store.has_correct_quest_answer("q1", "p1").await);
        assert!(!store.has_correct_quest_answer("q1", "p2").await);
        assert!(store.latest_attempt_at("u1", "p1").await.is_some());
        assert!(store.latest_attempt_at("u1", "p9").await.is_none());
    }
}
