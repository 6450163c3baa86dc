//! Per-user daily streak state machine and milestone rewards.
//!
//! The transition itself is a pure function over (existing record, today);
//! the service around it persists the result, pays milestone rewards through
//! the progression ledger as a post-persist step, and emits bus events.
//! A payout or subscriber failure never rolls back the streak update.

use chrono::NaiveDate;
use serde_json::json;
use tracing::{error, info, instrument};

use crate::domain::{Milestone, StreakRecord, STREAK_MILESTONES};
use crate::error::AppError;
use crate::events::{TOPIC_MILESTONE_REACHED, TOPIC_PUZZLE_SOLVED};
use crate::progression;
use crate::state::AppState;
use crate::util::{date_key, resolve_timezone, today_in};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreakAdvance {
  /// First qualifying activity ever; record created.
  Started,
  /// Active yesterday, streak grows by one.
  Continued,
  /// Gap of two or more days; streak restarts at one.
  Reset,
  /// Already counted today; the record is returned unchanged.
  AlreadyCountedToday,
}

/// Advance a streak record to `today`. Pure; the caller persists the result
/// unless the advance was `AlreadyCountedToday`.
pub fn advance_streak(
  existing: Option<&StreakRecord>,
  user_id: &str,
  today: NaiveDate,
) -> (StreakRecord, StreakAdvance) {
  let mut record = match existing {
    None => {
      return (
        StreakRecord {
          user_id: user_id.to_string(),
          current_streak: 1,
          longest_streak: 1,
          last_active_date: today,
          last_milestone_reached: None,
          streak_dates: vec![date_key(today)],
        },
        StreakAdvance::Started,
      );
    }
    Some(r) => r.clone(),
  };

  if record.last_active_date == today {
    return (record, StreakAdvance::AlreadyCountedToday);
  }

  let advance = if Some(record.last_active_date) == today.pred_opt() {
    record.current_streak += 1;
    StreakAdvance::Continued
  } else {
    // History is kept on a reset; longest_streak already preserves the peak.
    record.current_streak = 1;
    StreakAdvance::Reset
  };

  record.last_active_date = today;
  record.longest_streak = record.longest_streak.max(record.current_streak);
  let key = date_key(today);
  if !record.streak_dates.contains(&key) {
    record.streak_dates.push(key);
  }
  (record, advance)
}

/// The milestone to award for this update, if any: the largest threshold at
/// or below the current streak that is strictly above the watermark. At most
/// one per update; skipped-over thresholds are never paid retroactively.
pub fn milestone_to_award(
  current_streak: u32,
  last_reached: Option<u32>,
) -> Option<&'static Milestone> {
  STREAK_MILESTONES
    .iter()
    .rev()
    .find(|m| m.days <= current_streak && last_reached.map_or(true, |lr| m.days > lr))
}

/// Advance the user's streak for today in the caller's timezone, then run
/// the milestone check. Calling this any number of times on the same
/// calendar day is a no-op after the first.
#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn update_streak(
  state: &AppState,
  user_id: &str,
  timezone: Option<&str>,
) -> Result<StreakRecord, AppError> {
  if state.users.get(user_id).await.is_none() {
    return Err(AppError::not_found("user", user_id));
  }
  let tz = resolve_timezone(timezone)?;
  let today = today_in(tz);

  let existing = state.streaks.get(user_id).await;
  let (mut record, advance) = advance_streak(existing.as_ref(), user_id, today);

  if advance == StreakAdvance::AlreadyCountedToday {
    return Ok(record);
  }
  state.streaks.upsert(record.clone()).await;
  info!(target: "streak", %user_id, streak = record.current_streak, ?advance, "streak updated");

  if let Some(milestone) = milestone_to_award(record.current_streak, record.last_milestone_reached) {
    record.last_milestone_reached = Some(milestone.days);
    state.streaks.upsert(record.clone()).await;

    // Post-persist payout: a failure here is logged, the streak stands.
    match progression::award_bonus(&state.users, user_id, milestone.xp, milestone.tokens).await {
      Ok(up) => {
        info!(target: "streak", %user_id, milestone = milestone.days, xp = milestone.xp, tokens = milestone.tokens, new_xp = up.new_xp, new_tokens = up.tokens, "milestone reward paid");
      }
      Err(e) => {
        error!(target: "streak", %user_id, milestone = milestone.days, error = %e, "milestone payout failed; streak update kept");
      }
    }
    state.bus.emit(
      TOPIC_MILESTONE_REACHED,
      json!({
        "userId": user_id,
        "milestone": milestone.days,
        "reward": {
          "bonusXp": milestone.xp,
          "bonusTokens": milestone.tokens,
          "reason": milestone.description,
        },
      }),
    );
  }

  state.bus.emit(
    TOPIC_PUZZLE_SOLVED,
    json!({
      "userId": user_id,
      "streakCount": record.current_streak,
      "isNewStreak": advance == StreakAdvance::Started,
    }),
  );

  Ok(record)
}

/// Read-only streak lookup; `None` means the user has no qualifying
/// activity yet.
pub async fn get_streak(state: &AppState, user_id: &str) -> Option<StreakRecord> {
  state.streaks.get(user_id).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::state::AppState;

  fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn first_activity_starts_a_streak() {
    let today = day(2026, 8, 6);
    let (rec, adv) = advance_streak(None, "u1", today);
    assert_eq!(adv, StreakAdvance::Started);
    assert_eq!(rec.current_streak, 1);
    assert_eq!(rec.longest_streak, 1);
    assert_eq!(rec.last_active_date, today);
    assert_eq!(rec.streak_dates, vec!["2026-08-06".to_string()]);
  }

  #[test]
  fn same_day_advance_is_a_noop() {
    let today = day(2026, 8, 6);
    let (first, _) = advance_streak(None, "u1", today);
    let (second, adv) = advance_streak(Some(&first), "u1", today);
    assert_eq!(adv, StreakAdvance::AlreadyCountedToday);
    assert_eq!(second.current_streak, first.current_streak);
    assert_eq!(second.streak_dates, first.streak_dates);
  }

  #[test]
  fn consecutive_day_continues() {
    let (rec, _) = advance_streak(None, "u1", day(2026, 8, 5));
    let (rec, adv) = advance_streak(Some(&rec), "u1", day(2026, 8, 6));
    assert_eq!(adv, StreakAdvance::Continued);
    assert_eq!(rec.current_streak, 2);
    assert_eq!(rec.longest_streak, 2);
    assert_eq!(rec.streak_dates.len(), 2);
  }

  #[test]
  fn gap_resets_but_longest_survives() {
    let mut rec = advance_streak(None, "u1", day(2026, 8, 1)).0;
    for d in 2..=5 {
      rec = advance_streak(Some(&rec), "u1", day(2026, 8, d)).0;
    }
    assert_eq!(rec.current_streak, 5);

    let (rec, adv) = advance_streak(Some(&rec), "u1", day(2026, 8, 20));
    assert_eq!(adv, StreakAdvance::Reset);
    assert_eq!(rec.current_streak, 1);
    assert_eq!(rec.longest_streak, 5);
    assert!(rec.streak_dates.contains(&"2026-08-20".to_string()));
  }

  #[test]
  fn longest_streak_never_decreases_across_sequences() {
    let dates = [
      day(2026, 1, 1),
      day(2026, 1, 2),
      day(2026, 1, 3),
      day(2026, 1, 10),
      day(2026, 1, 11),
      day(2026, 2, 1),
    ];
    let mut rec: Option<StreakRecord> = None;
    let mut prev_longest = 0;
    for d in dates {
      let (next, _) = advance_streak(rec.as_ref(), "u1", d);
      assert!(next.longest_streak >= prev_longest);
      assert!(next.longest_streak >= next.current_streak);
      prev_longest = next.longest_streak;
      rec = Some(next);
    }
  }

  #[test]
  fn milestone_selection_awards_highest_crossed_once() {
    assert!(milestone_to_award(2, None).is_none());
    assert_eq!(milestone_to_award(3, None).unwrap().days, 3);
    // A jump from 2 to 15 pays milestone 14 only, never 3 and 7 as well.
    assert_eq!(milestone_to_award(15, None).unwrap().days, 14);
    // Watermark blocks re-awards.
    assert!(milestone_to_award(15, Some(14)).is_none());
    assert_eq!(milestone_to_award(30, Some(14)).unwrap().days, 30);
    // Watermark is monotone: nothing below it ever fires again.
    assert!(milestone_to_award(7, Some(14)).is_none());
  }

  #[tokio::test]
  async fn service_update_is_idempotent_within_a_day() {
    let state = AppState::for_tests();
    let first = update_streak(&state, "u-demo", None).await.unwrap();
    let second = update_streak(&state, "u-demo", None).await.unwrap();
    assert_eq!(first.current_streak, 1);
    assert_eq!(second.current_streak, first.current_streak);
    assert_eq!(second.streak_dates, first.streak_dates);
  }

  #[tokio::test]
  async fn milestone_reward_is_paid_exactly_once() {
    let state = AppState::for_tests();
    let today = today_in(chrono_tz::Tz::UTC);

    // User was active yesterday and the day before: today's update crosses 3.
    state
      .streaks
      .upsert(StreakRecord {
        user_id: "u-demo".into(),
        current_streak: 2,
        longest_streak: 2,
        last_active_date: today.pred_opt().unwrap(),
        last_milestone_reached: None,
        streak_dates: vec![],
      })
      .await;

    let mut rx = state.bus.subscribe();
    let rec = update_streak(&state, "u-demo", None).await.unwrap();
    assert_eq!(rec.current_streak, 3);
    assert_eq!(rec.last_milestone_reached, Some(3));

    let user = state.users.get("u-demo").await.unwrap();
    assert_eq!(user.xp, 50);
    assert_eq!(user.tokens, 5);

    let ev = rx.recv().await.unwrap();
    assert_eq!(ev.topic, TOPIC_MILESTONE_REACHED);
    assert_eq!(ev.payload["milestone"], 3);

    // Same-day retrigger: no growth, no second payout.
    let again = update_streak(&state, "u-demo", None).await.unwrap();
    assert_eq!(again.current_streak, 3);
    let user = state.users.get("u-demo").await.unwrap();
    assert_eq!(user.xp, 50);
    assert_eq!(user.tokens, 5);
  }

  #[tokio::test]
  async fn unknown_user_is_rejected() {
    let state = AppState::for_tests();
    assert!(matches!(
      update_streak(&state, "ghost", None).await,
      Err(AppError::NotFound { .. })
    ));
  }
}
