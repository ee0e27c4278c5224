//! Calendar distance helpers.
//!
//! Two conventions coexist and are not interchangeable:
//! - `days_until_clamped` floors at zero ("0 = due today or already due"),
//!   used for goal and project countdowns.
//! - `days_until_signed` goes negative for past dates ("overdue by N"),
//!   used for compliance deadlines and bills.

use chrono::{DateTime, NaiveDate, Utc};

/// Parses `YYYY-MM-DD` or an RFC 3339 timestamp into a calendar day.
///
/// Timestamps are reduced to their UTC date.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(day);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|stamp| stamp.with_timezone(&Utc).date_naive())
}

/// Current UTC calendar day.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Whole days from `today` to `date`; negative when `date` is in the past.
///
/// Returns `None` when `date` does not parse.
pub fn days_until_signed(date: &str, today: NaiveDate) -> Option<i64> {
    parse_day(date).map(|day| (day - today).num_days())
}

/// Whole days from `today` to `date`, never below zero.
pub fn days_until_clamped(date: &str, today: NaiveDate) -> Option<i64> {
    days_until_signed(date, today).map(|days| days.max(0))
}

/// True when `date` parses and lies strictly before `today`.
pub fn is_overdue(date: &str, today: NaiveDate) -> bool {
    days_until_signed(date, today).is_some_and(|days| days < 0)
}
