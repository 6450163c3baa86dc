//! Answer scoring: correctness plus time-weighted points.
//!
//! Pure and deterministic; no store access. The submission flow persists
//! whatever this module computes, so re-scoring never happens downstream.

use crate::domain::Puzzle;
use crate::error::AppError;
use crate::util::normalize_answer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreOutcome {
  pub is_correct: bool,
  pub points_earned: u32,
}

/// Score one submission. A zero time limit is broken content and fails fast
/// rather than dividing through it.
pub fn score_submission(
  puzzle: &Puzzle,
  answer: &str,
  elapsed_secs: u32,
  skipped: bool,
) -> Result<ScoreOutcome, AppError> {
  if puzzle.time_limit_secs == 0 {
    return Err(AppError::Configuration(format!(
      "puzzle {} has a non-positive time limit",
      puzzle.id
    )));
  }

  let is_correct =
    !skipped && normalize_answer(answer) == normalize_answer(&puzzle.correct_answer);
  if !is_correct {
    return Ok(ScoreOutcome { is_correct: false, points_earned: 0 });
  }

  let multiplier = time_multiplier(elapsed_secs, puzzle.time_limit_secs);
  let points_earned = (puzzle.base_points as f64 * multiplier).round() as u32;
  Ok(ScoreOutcome { is_correct: true, points_earned })
}

/// Step function over elapsed/limit. Fast answers earn up to 20% extra,
/// answers past the limit lose 10%. `elapsed == 0` lands in the fastest
/// bucket.
fn time_multiplier(elapsed_secs: u32, time_limit_secs: u32) -> f64 {
  let ratio = elapsed_secs as f64 / time_limit_secs as f64;
  if ratio <= 0.5 {
    1.20
  } else if ratio <= 0.75 {
    1.10
  } else if ratio <= 1.0 {
    1.00
  } else {
    0.90
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Difficulty, PuzzleSource};

  fn piano_puzzle() -> Puzzle {
    Puzzle {
      id: "p101".into(),
      question: "What has keys but can't open locks?".into(),
      options: vec![],
      correct_answer: "A piano".into(),
      base_points: 100,
      time_limit_secs: 60,
      category_id: "cat-wordplay".into(),
      difficulty: Difficulty::Beginner,
      source: PuzzleSource::Seed,
    }
  }

  #[test]
  fn fast_correct_answer_earns_twenty_percent_bonus() {
    let out = score_submission(&piano_puzzle(), "A piano", 30, false).unwrap();
    assert!(out.is_correct);
    assert_eq!(out.points_earned, 120);
  }

  #[test]
  fn answer_past_the_limit_is_penalized() {
    let out = score_submission(&piano_puzzle(), "A piano", 70, false).unwrap();
    assert!(out.is_correct);
    assert_eq!(out.points_earned, 90);
  }

  #[test]
  fn comparison_ignores_case_and_whitespace() {
    let out = score_submission(&piano_puzzle(), "  a PIANO ", 59, false).unwrap();
    assert!(out.is_correct);
    assert_eq!(out.points_earned, 100);
  }

  #[test]
  fn multiplier_is_monotonically_non_increasing() {
    let p = piano_puzzle();
    // Bucket boundaries for a 60s limit: 30, 45, 60, beyond.
    let points: Vec<u32> = [30, 45, 60, 61]
      .iter()
      .map(|t| score_submission(&p, "A piano", *t, false).unwrap().points_earned)
      .collect();
    assert_eq!(points, vec![120, 110, 100, 90]);
    assert!(points.windows(2).all(|w| w[0] >= w[1]));
  }

  #[test]
  fn zero_elapsed_uses_fastest_bucket() {
    let out = score_submission(&piano_puzzle(), "A piano", 0, false).unwrap();
    assert_eq!(out.points_earned, 120);
  }

  #[test]
  fn wrong_or_skipped_earns_nothing() {
    let wrong = score_submission(&piano_puzzle(), "A map", 10, false).unwrap();
    assert!(!wrong.is_correct);
    assert_eq!(wrong.points_earned, 0);

    let skipped = score_submission(&piano_puzzle(), "A piano", 10, true).unwrap();
    assert!(!skipped.is_correct);
    assert_eq!(skipped.points_earned, 0);
  }

  #[test]
  fn zero_time_limit_is_a_configuration_error() {
    let mut p = piano_puzzle();
    p.time_limit_secs = 0;
    assert!(matches!(
      score_submission(&p, "A piano", 10, false),
      Err(AppError::Configuration(_))
    ));
  }
}
