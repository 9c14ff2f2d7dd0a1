//! Routine, completion and day-schedule commands
//!
//! Every write goes to the database first and is then applied to the
//! repository, which notifies subscribers.

use serde::{Deserialize, Serialize};

use super::{resolve_date, AppState, CommandError};
use crate::analytics::RoutineAnalytics;
use crate::db;
use crate::models::{DaySchedule, NewRoutine, RoutineDefinition, RoutineId, RoutinePatch};
use crate::store::RoutineRepository;

/// ---------------------------------------------------------------------------
/// Definitions
/// ---------------------------------------------------------------------------

pub fn list_routines(state: &AppState) -> Result<Vec<RoutineDefinition>, CommandError> {
  Ok(state.repo()?.routines().to_vec())
}

pub async fn add_routine(
  state: &AppState,
  input: NewRoutine,
) -> Result<RoutineDefinition, CommandError> {
  let routine = input.into_definition()?;
  let _writing = state.write_guard().await;
  db::save_routine(&state.db, &routine).await?;
  state.repo()?.save_routine(routine.clone());

  tracing::info!("Added {} routine {} ({})", routine.kind, routine.name, routine.id);
  Ok(routine)
}

pub async fn update_routine(
  state: &AppState,
  id: &str,
  patch: RoutinePatch,
) -> Result<RoutineDefinition, CommandError> {
  let _writing = state.write_guard().await;
  let mut routine = find_routine(state, id)?;
  routine.apply(patch)?;

  db::save_routine(&state.db, &routine).await?;
  state.repo()?.save_routine(routine.clone());

  tracing::info!("Updated routine {}", routine.id);
  Ok(routine)
}

/// Remove a routine definition; its completion history is kept
pub async fn delete_routine(state: &AppState, id: &str) -> Result<(), CommandError> {
  let id = RoutineId::from(id);
  let _writing = state.write_guard().await;
  if !db::delete_routine(&state.db, &id).await? {
    return Err(CommandError::NotFound(format!("routine {}", id)));
  }
  state.repo()?.delete_routine(&id);

  tracing::info!("Deleted routine {}", id);
  Ok(())
}

fn find_routine(state: &AppState, id: &str) -> Result<RoutineDefinition, CommandError> {
  state
    .repo()?
    .routine(&RoutineId::from(id))
    .cloned()
    .ok_or_else(|| CommandError::NotFound(format!("routine {}", id)))
}

/// ---------------------------------------------------------------------------
/// Completion
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueRoutine {
  #[serde(flatten)]
  pub routine: RoutineDefinition,
  pub completed: bool,
}

/// Routines due on `date` (default today) with their completion flags
pub fn due_routines(state: &AppState, date: Option<&str>) -> Result<Vec<DueRoutine>, CommandError> {
  let date = resolve_date(date)?;
  let repo = state.repo()?;
  let analytics = RoutineAnalytics::new(&*repo);

  Ok(
    analytics
      .due_set_for(date)
      .into_iter()
      .map(|routine| DueRoutine {
        completed: repo.history().is_completed(date, &routine.id),
        routine: routine.clone(),
      })
      .collect(),
  )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToggleOutcome {
  Completed,
  Uncompleted,
  /// Nothing changed; run the countdown and call `complete_timed_routine`
  TimerRequired { seconds: u64 },
}

/// Flip a routine's completion for `date`.
///
/// Completing a timed routine requires its countdown, so that case returns
/// `TimerRequired` without touching the history. Un-completing never does.
pub async fn toggle_routine(
  state: &AppState,
  date: Option<&str>,
  id: &str,
) -> Result<ToggleOutcome, CommandError> {
  let date = resolve_date(date)?;
  let _writing = state.write_guard().await;
  let routine = find_routine(state, id)?;
  let completed = state.repo()?.history().is_completed(date, &routine.id);

  if !completed && routine.requires_timer() {
    return Ok(ToggleOutcome::TimerRequired {
      seconds: routine.timer_seconds(),
    });
  }

  let now_completed = !completed;
  db::save_completion(&state.db, date, &routine.id, now_completed).await?;
  state
    .repo()?
    .set_completion(date, &routine.id, now_completed);

  tracing::debug!("Toggled {} on {} -> {}", routine.id, date, now_completed);
  Ok(if now_completed {
    ToggleOutcome::Completed
  } else {
    ToggleOutcome::Uncompleted
  })
}

/// Mark a timed routine complete once its countdown has run out
pub async fn complete_timed_routine(
  state: &AppState,
  date: Option<&str>,
  id: &str,
  elapsed_seconds: u64,
) -> Result<ToggleOutcome, CommandError> {
  let date = resolve_date(date)?;
  let _writing = state.write_guard().await;
  let routine = find_routine(state, id)?;

  let required = routine.timer_seconds();
  if elapsed_seconds < required {
    return Err(CommandError::InvalidInput(format!(
      "Timer not finished: {} of {} seconds",
      elapsed_seconds, required
    )));
  }

  db::save_completion(&state.db, date, &routine.id, true).await?;
  state.repo()?.set_completion(date, &routine.id, true);

  tracing::debug!("Completed timed routine {} on {}", routine.id, date);
  Ok(ToggleOutcome::Completed)
}

/// ---------------------------------------------------------------------------
/// Day schedule
/// ---------------------------------------------------------------------------

pub fn get_day_schedule(state: &AppState, date: Option<&str>) -> Result<DaySchedule, CommandError> {
  let date = resolve_date(date)?;
  Ok(state.repo()?.schedule().get(date))
}

pub async fn set_day_schedule(
  state: &AppState,
  date: Option<&str>,
  schedule: DaySchedule,
) -> Result<DaySchedule, CommandError> {
  let date = resolve_date(date)?;
  let _writing = state.write_guard().await;
  db::save_day_schedule(&state.db, date, schedule).await?;
  state.repo()?.set_day_schedule(date, schedule);

  tracing::debug!(
    "Schedule for {}: training={} game={}",
    date,
    schedule.has_training,
    schedule.has_game
  );
  Ok(schedule)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
