//! Completion store: which routine ids were marked done on which dates

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::RoutineId;

/// Date-keyed sets of completed routine ids.
///
/// Ids are weak references: nothing checks that a routine still exists, and
/// deleting a routine leaves its history in place.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionHistory(BTreeMap<NaiveDate, BTreeSet<RoutineId>>);

impl CompletionHistory {
  pub fn new() -> Self {
    Self::default()
  }

  /// Flip membership and return whether the id is now completed
  pub fn toggle(&mut self, date: NaiveDate, id: &RoutineId) -> bool {
    let completed = !self.is_completed(date, id);
    self.set_completed(date, id, completed);
    completed
  }

  /// Set membership explicitly. Returns true if anything changed.
  pub fn set_completed(&mut self, date: NaiveDate, id: &RoutineId, completed: bool) -> bool {
    if completed {
      return self.0.entry(date).or_default().insert(id.clone());
    }

    let Some(ids) = self.0.get_mut(&date) else {
      return false;
    };
    let removed = ids.remove(id);
    // Keep the map free of empty entries so a double toggle is a no-op
    if ids.is_empty() {
      self.0.remove(&date);
    }
    removed
  }

  pub fn is_completed(&self, date: NaiveDate, id: &RoutineId) -> bool {
    self.0.get(&date).is_some_and(|ids| ids.contains(id))
  }

  /// Completed ids for `date` (empty for dates never touched)
  pub fn completed_ids(&self, date: NaiveDate) -> BTreeSet<RoutineId> {
    self.0.get(&date).cloned().unwrap_or_default()
  }

  pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
    self.0.keys().copied()
  }

  pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &RoutineId)> + '_ {
    self
      .0
      .iter()
      .flat_map(|(date, ids)| ids.iter().map(move |id| (*date, id)))
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl FromIterator<(NaiveDate, RoutineId)> for CompletionHistory {
  fn from_iter<I: IntoIterator<Item = (NaiveDate, RoutineId)>>(iter: I) -> Self {
    let mut history = Self::new();
    for (date, id) in iter {
      history.set_completed(date, &id, true);
    }
    history
  }
}
