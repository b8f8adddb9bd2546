//! The due-window boundary.
//!
//! A card is due when its due date falls before the next local midnight, which
//! includes overdue cards and everything scheduled for the rest of today. Every
//! due check in the crate goes through [`DueWindow`].

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

use crate::domain::Card;

/// Start of the next calendar day in `now`'s time zone, as a UTC instant.
pub fn end_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
  let tz = now.timezone();
  let Some(tomorrow) = now.date_naive().succ_opt() else {
    return DateTime::<Utc>::MAX_UTC;
  };
  let midnight = tomorrow.and_time(NaiveTime::MIN);

  // Midnight can be skipped by a DST transition; use the first instant after it
  tz.from_local_datetime(&midnight)
    .earliest()
    .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
    .map(|end| end.with_timezone(&Utc))
    .unwrap_or_else(|| now.with_timezone(&Utc) + Duration::days(1))
}

/// Exclusive upper bound for "due today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueWindow {
  end: DateTime<Utc>,
}

impl DueWindow {
  pub fn for_day<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
    Self { end: end_of_day(now) }
  }

  pub fn end(&self) -> DateTime<Utc> {
    self.end
  }

  /// Never-scheduled cards are always due.
  pub fn contains(&self, card: &Card) -> bool {
    card.due_date.is_none_or(|due| due < self.end)
  }
}
