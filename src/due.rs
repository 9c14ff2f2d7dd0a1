//! Schedule resolver: decides which routines are due on a date

use chrono::{Datelike, NaiveDate};

use crate::models::{DaySchedule, RoutineDefinition, RoutineKind};

/// Is `routine` expected to be performed on `date`?
///
/// Daily routines only look at their weekday recurrence; training and game
/// routines only look at the day's schedule flags.
pub fn is_due(routine: &RoutineDefinition, date: NaiveDate, schedule: DaySchedule) -> bool {
  match routine.kind {
    RoutineKind::Daily => routine.recurrence.contains(date.weekday()),
    RoutineKind::Training => schedule.has_training,
    RoutineKind::Game => schedule.has_game,
  }
}

/// The subset of `routines` due on `date`, in their original order
pub fn due_set<'r>(
  routines: &'r [RoutineDefinition],
  date: NaiveDate,
  schedule: DaySchedule,
) -> Vec<&'r RoutineDefinition> {
  routines.iter().filter(|r| is_due(r, date, schedule)).collect()
}
