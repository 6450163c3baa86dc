//! Small utility helpers used across modules.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::AppError;

/// Normalize an answer for comparison: trim surrounding whitespace and fold
/// ASCII case. No locale-aware normalization beyond this.
pub fn normalize_answer(s: &str) -> String {
  s.trim().to_ascii_lowercase()
}

/// Resolve a caller-supplied IANA timezone name. Absent means UTC; an unknown
/// name is rejected rather than silently treated as UTC.
pub fn resolve_timezone(tz: Option<&str>) -> Result<Tz, AppError> {
  match tz {
    None => Ok(Tz::UTC),
    Some(name) => name
      .parse::<Tz>()
      .map_err(|_| AppError::InvalidTimezone(name.to_string())),
  }
}

/// The current calendar date in the given timezone. Two calls with different
/// timezones for the same instant can legitimately disagree; day boundaries
/// are user-local.
pub fn today_in(tz: Tz) -> NaiveDate {
  Utc::now().with_timezone(&tz).date_naive()
}

/// Canonical "YYYY-MM-DD" form used for streak date lists.
pub fn date_key(d: NaiveDate) -> String {
  d.format("%Y-%m-%d").to_string()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
#[allow(dead_code)]
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max { s.to_string() } else { format!("{}… ({} bytes total)", &s[..max], s.len()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_folds_case_and_trims() {
    assert_eq!(normalize_answer("  A Piano  "), "a piano");
    assert_eq!(normalize_answer("ECHO"), "echo");
  }

  #[test]
  fn timezone_defaults_to_utc() {
    assert_eq!(resolve_timezone(None).unwrap(), Tz::UTC);
    assert_eq!(resolve_timezone(Some("Asia/Kolkata")).unwrap().name(), "Asia/Kolkata");
  }

  #[test]
  fn unknown_timezone_is_rejected() {
    assert!(matches!(
      resolve_timezone(Some("Mars/Olympus_Mons")),
      Err(AppError::InvalidTimezone(_))
    ));
  }
}
