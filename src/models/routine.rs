use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::calendar;

/// Opaque, stable routine identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutineId(String);

impl RoutineId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn generate() -> Self {
    Self(uuid::Uuid::new_v4().to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for RoutineId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for RoutineId {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

/// Which due-ness rule applies to a routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineKind {
  /// Recurs on a fixed set of weekdays
  #[serde(alias = "일상")]
  Daily,
  /// Due on days flagged as training days
  Training,
  /// Due on days flagged as game days
  Game,
}

impl fmt::Display for RoutineKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Daily => write!(f, "daily"),
      Self::Training => write!(f, "training"),
      Self::Game => write!(f, "game"),
    }
  }
}

impl std::str::FromStr for RoutineKind {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "daily" | "일상" => Ok(Self::Daily),
      "training" => Ok(Self::Training),
      "game" => Ok(Self::Game),
      _ => Err(format!("Unknown routine kind: {}", s)),
    }
  }
}

// ---------------------------------------------------------------------------
/// Weekday recurrence set
// ---------------------------------------------------------------------------

/// A set over the seven weekdays, stored as a bitmask (bit 0 = Monday).
///
/// Serialized as the `{ "mon": true, ..., "sun": false }` object used by the
/// persisted routine records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "DayFlags", into = "DayFlags")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
  pub const EMPTY: Self = Self(0);
  pub const ALL: Self = Self(0b111_1111);

  pub fn from_weekdays(days: &[Weekday]) -> Self {
    days.iter().fold(Self::EMPTY, |set, d| set.with(*d))
  }

  pub fn with(self, day: Weekday) -> Self {
    Self(self.0 | Self::bit(day))
  }

  pub fn contains(&self, day: Weekday) -> bool {
    self.0 & Self::bit(day) != 0
  }

  pub fn is_empty(&self) -> bool {
    self.0 == 0
  }

  pub fn len(&self) -> usize {
    self.0.count_ones() as usize
  }

  /// Contained weekdays, Monday first
  pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
    calendar::weekdays().into_iter().filter(move |d| self.contains(*d))
  }

  fn bit(day: Weekday) -> u8 {
    1 << day.num_days_from_monday()
  }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
struct DayFlags {
  mon: bool,
  tue: bool,
  wed: bool,
  thu: bool,
  fri: bool,
  sat: bool,
  sun: bool,
}

impl From<DayFlags> for WeekdaySet {
  fn from(f: DayFlags) -> Self {
    let flags = [f.mon, f.tue, f.wed, f.thu, f.fri, f.sat, f.sun];
    flags
      .iter()
      .enumerate()
      .filter(|(_, on)| **on)
      .fold(WeekdaySet::EMPTY, |set, (i, _)| set.with(calendar::weekday_from_index(i)))
  }
}

impl From<WeekdaySet> for DayFlags {
  fn from(set: WeekdaySet) -> Self {
    DayFlags {
      mon: set.contains(Weekday::Mon),
      tue: set.contains(Weekday::Tue),
      wed: set.contains(Weekday::Wed),
      thu: set.contains(Weekday::Thu),
      fri: set.contains(Weekday::Fri),
      sat: set.contains(Weekday::Sat),
      sun: set.contains(Weekday::Sun),
    }
  }
}

// ---------------------------------------------------------------------------
/// Routine Definition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineDefinition {
  pub id: RoutineId,
  pub name: String,
  #[serde(rename = "type")]
  pub kind: RoutineKind,
  /// Weekdays a daily routine recurs on; always empty for other kinds
  #[serde(rename = "days", default)]
  pub recurrence: WeekdaySet,
  /// Countdown length; completing the routine requires running the timer
  #[serde(default, alias = "duration", skip_serializing_if = "Option::is_none")]
  pub timer_minutes: Option<u32>,
  /// Display-only time of day
  #[serde(
    default,
    rename = "time",
    with = "time_of_day",
    skip_serializing_if = "Option::is_none"
  )]
  pub scheduled_time: Option<NaiveTime>,
  #[serde(default = "Utc::now")]
  pub created_at: DateTime<Utc>,
}

impl RoutineDefinition {
  pub fn requires_timer(&self) -> bool {
    self.timer_minutes.is_some_and(|m| m > 0)
  }

  /// Timer length in seconds (0 when the routine is untimed)
  pub fn timer_seconds(&self) -> u64 {
    self.timer_minutes.map(|m| m as u64 * 60).unwrap_or(0)
  }

  pub fn apply(&mut self, patch: RoutinePatch) -> Result<(), ValidationError> {
    if let Some(name) = patch.name {
      self.name = validate_name(&name)?;
    }
    if let Some(recurrence) = patch.recurrence {
      self.recurrence = validate_recurrence(self.kind, recurrence)?;
    }
    if let Some(timer) = patch.timer_minutes {
      self.timer_minutes = validate_timer(timer)?;
    }
    if let Some(time) = patch.scheduled_time {
      self.scheduled_time = time;
    }
    Ok(())
  }
}

/// Input for creating a routine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoutine {
  pub name: String,
  pub kind: RoutineKind,
  #[serde(default)]
  pub recurrence: WeekdaySet,
  #[serde(default)]
  pub timer_minutes: Option<u32>,
  #[serde(default, with = "time_of_day")]
  pub scheduled_time: Option<NaiveTime>,
}

impl NewRoutine {
  pub fn daily(name: &str, days: &[Weekday]) -> Self {
    Self {
      name: name.to_string(),
      kind: RoutineKind::Daily,
      recurrence: WeekdaySet::from_weekdays(days),
      timer_minutes: None,
      scheduled_time: None,
    }
  }

  pub fn for_kind(name: &str, kind: RoutineKind) -> Self {
    Self {
      name: name.to_string(),
      kind,
      recurrence: WeekdaySet::EMPTY,
      timer_minutes: None,
      scheduled_time: None,
    }
  }

  /// Validate and assign an identifier
  pub fn into_definition(self) -> Result<RoutineDefinition, ValidationError> {
    Ok(RoutineDefinition {
      id: RoutineId::generate(),
      name: validate_name(&self.name)?,
      kind: self.kind,
      recurrence: validate_recurrence(self.kind, self.recurrence)?,
      timer_minutes: validate_timer(self.timer_minutes)?,
      scheduled_time: self.scheduled_time,
      created_at: Utc::now(),
    })
  }
}

/// Edit of the mutable routine fields. `None` leaves a field untouched.
///
/// In JSON a missing field leaves it untouched and an explicit `null`
/// clears the timer or the time of day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutinePatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub recurrence: Option<WeekdaySet>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "present_or_null"
  )]
  pub timer_minutes: Option<Option<u32>>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    serialize_with = "patch_time::serialize",
    deserialize_with = "patch_time::deserialize"
  )]
  pub scheduled_time: Option<Option<NaiveTime>>,
}

/// A present field decodes to `Some`, including `null` as `Some(None)`
fn present_or_null<'de, T, D>(d: D) -> Result<Option<Option<T>>, D::Error>
where
  T: Deserialize<'de>,
  D: serde::Deserializer<'de>,
{
  Option::<T>::deserialize(d).map(Some)
}

/// `HH:MM` or `null` inside a patch. Unlike stored routines, a bad time is
/// an error rather than "no time set".
mod patch_time {
  use chrono::NaiveTime;
  use serde::de::Error;
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(
    time: &Option<Option<NaiveTime>>,
    s: S,
  ) -> Result<S::Ok, S::Error> {
    super::time_of_day::serialize(&time.flatten(), s)
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    d: D,
  ) -> Result<Option<Option<NaiveTime>>, D::Error> {
    match Option::<String>::deserialize(d)? {
      None => Ok(Some(None)),
      Some(raw) => super::time_of_day::parse(&raw)
        .map(|t| Some(Some(t)))
        .ok_or_else(|| D::Error::custom(format!("invalid time of day: {:?}", raw))),
    }
  }
}

/// `HH:MM` time of day. Unparsable values read as "no time set".
pub(crate) mod time_of_day {
  use chrono::NaiveTime;
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
    match time {
      Some(t) => s.serialize_str(&t.format("%H:%M").to_string()),
      None => s.serialize_none(),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(d)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse))
  }

  pub fn parse(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
      .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
      .ok()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
  #[error("Routine name must not be empty")]
  EmptyName,

  #[error("Timer length must be a positive number of minutes")]
  InvalidTimer,

  #[error("A daily routine needs at least one weekday")]
  NoWeekdays,
}

fn validate_name(name: &str) -> Result<String, ValidationError> {
  let trimmed = name.trim();
  if trimmed.is_empty() {
    return Err(ValidationError::EmptyName);
  }
  Ok(trimmed.to_string())
}

fn validate_timer(minutes: Option<u32>) -> Result<Option<u32>, ValidationError> {
  match minutes {
    Some(0) => Err(ValidationError::InvalidTimer),
    other => Ok(other),
  }
}

fn validate_recurrence(kind: RoutineKind, days: WeekdaySet) -> Result<WeekdaySet, ValidationError> {
  match kind {
    RoutineKind::Daily if days.is_empty() => Err(ValidationError::NoWeekdays),
    RoutineKind::Daily => Ok(days),
    RoutineKind::Training | RoutineKind::Game => Ok(WeekdaySet::EMPTY),
  }
}
