use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Training/game flags for one calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DaySchedule {
  pub has_training: bool,
  pub has_game: bool,
}

impl DaySchedule {
  pub fn training() -> Self {
    Self {
      has_training: true,
      has_game: false,
    }
  }

  pub fn game() -> Self {
    Self {
      has_training: false,
      has_game: true,
    }
  }
}

/// Per-date schedule flags. A date without an entry has the default
/// (no training, no game).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleBook(BTreeMap<NaiveDate, DaySchedule>);

impl ScheduleBook {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, date: NaiveDate) -> DaySchedule {
    self.0.get(&date).copied().unwrap_or_default()
  }

  /// Overwrite the entry for `date`. Returns true if the flags changed.
  pub fn set(&mut self, date: NaiveDate, schedule: DaySchedule) -> bool {
    let previous = self.0.insert(date, schedule).unwrap_or_default();
    previous != schedule
  }

  pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, DaySchedule)> + '_ {
    self.0.iter().map(|(d, s)| (*d, *s))
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl FromIterator<(NaiveDate, DaySchedule)> for ScheduleBook {
  fn from_iter<I: IntoIterator<Item = (NaiveDate, DaySchedule)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}
