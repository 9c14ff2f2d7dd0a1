//! Repository abstraction over routines, schedule flags, completion history
//! and the result log
//!
//! Analytics depend only on [`RoutineRepository`]. Writes notify subscribers
//! synchronously, after the write is applied, so a listener that recomputes
//! stats always reads the new state. Writes that change nothing stay silent.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use crate::calendar;
use crate::completion::CompletionHistory;
use crate::models::{DaySchedule, ResultRecord, RoutineDefinition, RoutineId, ScheduleBook};

/// ---------------------------------------------------------------------------
/// Snapshot
/// ---------------------------------------------------------------------------

/// Everything the repository holds, in its persisted JSON shape
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
  pub routines: Vec<RoutineDefinition>,
  pub schedule: ScheduleBook,
  pub completion_history: CompletionHistory,
  pub result_log: Vec<ResultRecord>,
}

impl Snapshot {
  /// Decode a snapshot, keeping whatever parses.
  ///
  /// Each section and each record is decoded on its own; malformed parts
  /// are dropped and unparsable input yields an empty snapshot. When ids
  /// repeat, the first routine or result with that id is kept.
  pub fn from_json_lenient(json: &str) -> Self {
    let Ok(Value::Object(root)) = serde_json::from_str::<Value>(json) else {
      return Self::default();
    };

    let mut routine_ids = HashSet::new();
    let routines = array_items(root.get("routines"))
      .filter_map(|v| serde_json::from_value::<RoutineDefinition>(v.clone()).ok())
      .filter(|routine| routine_ids.insert(routine.id.clone()))
      .collect();

    let schedule = object_entries(root.get("schedule"))
      .filter_map(|(key, v)| {
        let date = calendar::parse_date_key(key)?;
        let flags = serde_json::from_value::<DaySchedule>(v.clone()).ok()?;
        Some((date, flags))
      })
      .collect();

    let completion_history = object_entries(root.get("completionHistory"))
      .filter_map(|(key, v)| Some((calendar::parse_date_key(key)?, v)))
      .flat_map(|(date, ids)| {
        array_items(Some(ids))
          .filter_map(|id| id.as_str().map(|s| (date, RoutineId::from(s))))
          .collect::<Vec<_>>()
      })
      .collect();

    let mut result_ids = HashSet::new();
    let result_log = array_items(root.get("resultLog"))
      .filter_map(|v| serde_json::from_value::<ResultRecord>(v.clone()).ok())
      .filter(|record| result_ids.insert(record.id().to_string()))
      .collect();

    Self {
      routines,
      schedule,
      completion_history,
      result_log,
    }
  }
}

fn array_items(value: Option<&Value>) -> impl Iterator<Item = &Value> {
  value
    .and_then(Value::as_array)
    .into_iter()
    .flat_map(|items| items.iter())
}

fn object_entries(value: Option<&Value>) -> impl Iterator<Item = (&String, &Value)> {
  value
    .and_then(Value::as_object)
    .into_iter()
    .flat_map(|map| map.iter())
}

/// ---------------------------------------------------------------------------
/// Change Notification
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
  RoutineSaved {
    id: RoutineId,
  },
  RoutineDeleted {
    id: RoutineId,
  },
  CompletionChanged {
    date: NaiveDate,
    id: RoutineId,
    completed: bool,
  },
  ScheduleChanged {
    date: NaiveDate,
    schedule: DaySchedule,
  },
  ResultRecorded {
    id: String,
  },
  ResultDeleted {
    id: String,
  },
  Replaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Listener = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

/// ---------------------------------------------------------------------------
/// Repository Trait
/// ---------------------------------------------------------------------------

pub trait RoutineRepository {
  // Reads
  fn routines(&self) -> &[RoutineDefinition];
  fn schedule(&self) -> &ScheduleBook;
  fn history(&self) -> &CompletionHistory;
  fn results(&self) -> &[ResultRecord];

  fn routine(&self, id: &RoutineId) -> Option<&RoutineDefinition> {
    self.routines().iter().find(|r| &r.id == id)
  }

  fn snapshot(&self) -> Snapshot {
    Snapshot {
      routines: self.routines().to_vec(),
      schedule: self.schedule().clone(),
      completion_history: self.history().clone(),
      result_log: self.results().to_vec(),
    }
  }

  // Writes

  /// Insert, or replace the routine with the same id in place
  fn save_routine(&mut self, routine: RoutineDefinition);

  /// Remove a definition. Completion history is left untouched.
  fn delete_routine(&mut self, id: &RoutineId) -> Option<RoutineDefinition>;

  /// Returns true if membership changed
  fn set_completion(&mut self, date: NaiveDate, id: &RoutineId, completed: bool) -> bool;

  /// Returns the new completion state
  fn toggle_completion(&mut self, date: NaiveDate, id: &RoutineId) -> bool;

  /// Returns true if the flags changed
  fn set_day_schedule(&mut self, date: NaiveDate, schedule: DaySchedule) -> bool;

  fn record_result(&mut self, record: ResultRecord);
  fn delete_result(&mut self, id: &str) -> Option<ResultRecord>;
  fn replace(&mut self, snapshot: Snapshot);

  // Subscriptions
  fn subscribe(&mut self, listener: Listener) -> SubscriptionId;
  fn unsubscribe(&mut self, id: SubscriptionId) -> bool;
}

/// ---------------------------------------------------------------------------
/// In-memory Repository
/// ---------------------------------------------------------------------------

/// In-memory repository; the application state and the test fake
#[derive(Default)]
pub struct MemoryRepository {
  data: Snapshot,
  listeners: Vec<(SubscriptionId, Listener)>,
  next_subscription: u64,
}

impl fmt::Debug for MemoryRepository {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MemoryRepository")
      .field("routines", &self.data.routines.len())
      .field("results", &self.data.result_log.len())
      .field("listeners", &self.listeners.len())
      .finish()
  }
}

impl MemoryRepository {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_snapshot(snapshot: Snapshot) -> Self {
    Self {
      data: snapshot,
      ..Self::default()
    }
  }

  fn notify(&self, event: ChangeEvent) {
    for (_, listener) in &self.listeners {
      listener(&event);
    }
  }
}

impl RoutineRepository for MemoryRepository {
  fn routines(&self) -> &[RoutineDefinition] {
    &self.data.routines
  }

  fn schedule(&self) -> &ScheduleBook {
    &self.data.schedule
  }

  fn history(&self) -> &CompletionHistory {
    &self.data.completion_history
  }

  fn results(&self) -> &[ResultRecord] {
    &self.data.result_log
  }

  fn save_routine(&mut self, routine: RoutineDefinition) {
    let id = routine.id.clone();
    match self.data.routines.iter_mut().find(|r| r.id == id) {
      Some(existing) if *existing == routine => return,
      Some(existing) => *existing = routine,
      None => self.data.routines.push(routine),
    }
    self.notify(ChangeEvent::RoutineSaved { id });
  }

  fn delete_routine(&mut self, id: &RoutineId) -> Option<RoutineDefinition> {
    let index = self.data.routines.iter().position(|r| &r.id == id)?;
    let removed = self.data.routines.remove(index);
    self.notify(ChangeEvent::RoutineDeleted { id: id.clone() });
    Some(removed)
  }

  fn set_completion(&mut self, date: NaiveDate, id: &RoutineId, completed: bool) -> bool {
    let changed = self.data.completion_history.set_completed(date, id, completed);
    if changed {
      self.notify(ChangeEvent::CompletionChanged {
        date,
        id: id.clone(),
        completed,
      });
    }
    changed
  }

  fn toggle_completion(&mut self, date: NaiveDate, id: &RoutineId) -> bool {
    let completed = self.data.completion_history.toggle(date, id);
    self.notify(ChangeEvent::CompletionChanged {
      date,
      id: id.clone(),
      completed,
    });
    completed
  }

  fn set_day_schedule(&mut self, date: NaiveDate, schedule: DaySchedule) -> bool {
    let changed = self.data.schedule.set(date, schedule);
    if changed {
      self.notify(ChangeEvent::ScheduleChanged { date, schedule });
    }
    changed
  }

  fn record_result(&mut self, record: ResultRecord) {
    let id = record.id().to_string();
    match self.data.result_log.iter_mut().find(|r| r.id() == id) {
      Some(existing) if *existing == record => return,
      Some(existing) => *existing = record,
      None => self.data.result_log.push(record),
    }
    self.notify(ChangeEvent::ResultRecorded { id });
  }

  fn delete_result(&mut self, id: &str) -> Option<ResultRecord> {
    let index = self.data.result_log.iter().position(|r| r.id() == id)?;
    let removed = self.data.result_log.remove(index);
    self.notify(ChangeEvent::ResultDeleted { id: id.to_string() });
    Some(removed)
  }

  fn replace(&mut self, snapshot: Snapshot) {
    self.data = snapshot;
    self.notify(ChangeEvent::Replaced);
  }

  fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
    let id = SubscriptionId(self.next_subscription);
    self.next_subscription += 1;
    self.listeners.push((id, listener));
    id
  }

  fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
    let before = self.listeners.len();
    self.listeners.retain(|(sid, _)| *sid != id);
    self.listeners.len() != before
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
