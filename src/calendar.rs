//! Calendar helpers shared by every date-indexed computation
//!
//! All weekday indexing in the crate goes through this module: Monday is
//! index 0 and Sunday is index 6, and ISO weeks start on Monday. Dates are
//! local calendar days (`NaiveDate`), never instants.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Canonical date key format (`yyyy-MM-dd`)
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

const WEEKDAYS: [Weekday; 7] = [
  Weekday::Mon,
  Weekday::Tue,
  Weekday::Wed,
  Weekday::Thu,
  Weekday::Fri,
  Weekday::Sat,
  Weekday::Sun,
];

/// Format a date as its canonical key
pub fn date_key(date: NaiveDate) -> String {
  date.format(DATE_KEY_FORMAT).to_string()
}

/// Parse a canonical date key, returning None for anything malformed
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(key.trim(), DATE_KEY_FORMAT).ok()
}

/// Monday-first weekday index (Mon = 0 .. Sun = 6)
pub fn weekday_index(date: NaiveDate) -> usize {
  date.weekday().num_days_from_monday() as usize
}

/// Inverse of `weekday_index`.
///
/// Panics on an index outside 0..7; callers only ever pass indices derived
/// from `weekday_index` or a 7-element iteration.
pub fn weekday_from_index(index: usize) -> Weekday {
  assert!(index < 7, "weekday index out of range: {}", index);
  WEEKDAYS[index]
}

/// All seven weekdays, Monday first
pub fn weekdays() -> [Weekday; 7] {
  WEEKDAYS
}

/// Short English label for a weekday
pub fn weekday_label(weekday: Weekday) -> &'static str {
  match weekday {
    Weekday::Mon => "Mon",
    Weekday::Tue => "Tue",
    Weekday::Wed => "Wed",
    Weekday::Thu => "Thu",
    Weekday::Fri => "Fri",
    Weekday::Sat => "Sat",
    Weekday::Sun => "Sun",
  }
}

pub fn is_weekend(weekday: Weekday) -> bool {
  matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// Monday of the ISO week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
  date - Duration::days(weekday_index(date) as i64)
}

/// The seven dates (Mon..Sun) of the ISO week containing `date`
pub fn week_dates(date: NaiveDate) -> Vec<NaiveDate> {
  let start = week_start(date);
  (0..7).map(|i| start + Duration::days(i)).collect()
}

/// First day of the calendar month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
  date.with_day(1).unwrap_or(date)
}

/// First day of the month `months` calendar months before `date`'s month
pub fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
  let total = date.year() * 12 + date.month0() as i32 - months as i32;
  let year = total.div_euclid(12);
  let month0 = total.rem_euclid(12) as u32;
  NaiveDate::from_ymd_opt(year, month0 + 1, 1).unwrap_or_else(|| month_start(date))
}

/// Every date of the calendar month containing `date`
pub fn month_dates(date: NaiveDate) -> Vec<NaiveDate> {
  let start = month_start(date);
  let mut dates = Vec::with_capacity(31);
  let mut current = Some(start);
  while let Some(day) = current {
    if day.month() != start.month() {
      break;
    }
    dates.push(day);
    current = day.succ_opt();
  }
  dates
}

/// Walk backwards from `today` (inclusive) for at most `count` days.
///
/// Stops early at the earliest representable date.
pub fn days_back(today: NaiveDate, count: u32) -> impl Iterator<Item = NaiveDate> {
  std::iter::successors(Some(today), |d| d.pred_opt()).take(count as usize)
}

/// Drop dates that lie after `today`
pub fn clamp_to_today(dates: &[NaiveDate], today: NaiveDate) -> Vec<NaiveDate> {
  dates.iter().copied().filter(|d| *d <= today).collect()
}
