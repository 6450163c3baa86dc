//! Seed data and small utilities related to default content.

use crate::domain::{Category, Difficulty, Puzzle, PuzzleSource, UserProfile};

/// Built-in categories. Config-bank categories are merged on top of these.
pub fn seed_categories() -> Vec<Category> {
  vec![
    Category { id: "cat-logic".into(), name: "Logic".into(), is_active: true },
    Category { id: "cat-wordplay".into(), name: "Wordplay".into(), is_active: true },
    Category { id: "cat-math".into(), name: "Math".into(), is_active: true },
  ]
}

/// Minimal set of built-in puzzles that guarantee the app is useful even
/// without external config.
pub fn seed_puzzles() -> Vec<Puzzle> {
  vec![
    Puzzle {
      id: "p101".into(),
      question: "What has keys but can't open locks?".into(),
      options: vec!["A piano".into(), "A map".into(), "A clock".into(), "A coin".into()],
      correct_answer: "A piano".into(),
      base_points: 100,
      time_limit_secs: 60,
      category_id: "cat-wordplay".into(),
      difficulty: Difficulty::Beginner,
      source: PuzzleSource::Seed,
    },
    Puzzle {
      id: "p102".into(),
      question: "I speak without a mouth and hear without ears. What am I?".into(),
      options: vec!["An echo".into(), "A shadow".into(), "A ghost".into(), "A bell".into()],
      correct_answer: "An echo".into(),
      base_points: 100,
      time_limit_secs: 60,
      category_id: "cat-wordplay".into(),
      difficulty: Difficulty::Beginner,
      source: PuzzleSource::Seed,
    },
    Puzzle {
      id: "p103".into(),
      question: "What is the next number in the sequence 2, 6, 12, 20, 30?".into(),
      options: vec!["36".into(), "40".into(), "42".into(), "44".into()],
      correct_answer: "42".into(),
      base_points: 150,
      time_limit_secs: 90,
      category_id: "cat-math".into(),
      difficulty: Difficulty::Intermediate,
      source: PuzzleSource::Seed,
    },
    Puzzle {
      id: "p104".into(),
      question: "A farmer has 17 sheep and all but 9 die. How many are left?".into(),
      options: vec!["8".into(), "9".into(), "17".into(), "0".into()],
      correct_answer: "9".into(),
      base_points: 120,
      time_limit_secs: 45,
      category_id: "cat-logic".into(),
      difficulty: Difficulty::Beginner,
      source: PuzzleSource::Seed,
    },
    Puzzle {
      id: "p105".into(),
      question: "Which word becomes shorter when you add two letters to it?".into(),
      options: vec!["Short".into(), "Long".into(), "Word".into(), "Letter".into()],
      correct_answer: "Short".into(),
      base_points: 130,
      time_limit_secs: 60,
      category_id: "cat-wordplay".into(),
      difficulty: Difficulty::Intermediate,
      source: PuzzleSource::Seed,
    },
    Puzzle {
      id: "p106".into(),
      question: "If two typists type two pages in two minutes, how many typists type 18 pages in six minutes?".into(),
      options: vec!["3".into(), "6".into(), "9".into(), "18".into()],
      correct_answer: "6".into(),
      base_points: 200,
      time_limit_secs: 120,
      category_id: "cat-math".into(),
      difficulty: Difficulty::Advanced,
      source: PuzzleSource::Seed,
    },
  ]
}

/// Demo users so the flows are exercisable without an account system.
pub fn seed_users() -> Vec<UserProfile> {
  vec![
    UserProfile {
      id: "u-demo".into(),
      username: "demo".into(),
      xp: 0,
      level: 1,
      puzzles_completed: 0,
      tokens: 0,
      difficulty_tier: Difficulty::Beginner,
    },
    UserProfile {
      id: "u-advanced".into(),
      username: "advanced-demo".into(),
      xp: 0,
      level: 1,
      puzzles_completed: 0,
      tokens: 0,
      difficulty_tier: Difficulty::Advanced,
    },
  ]
}
