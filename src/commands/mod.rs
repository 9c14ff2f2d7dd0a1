pub mod results;
pub mod routines;
pub mod stats;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

use crate::calendar;
use crate::db::{self, DbPool, StoreError};
use crate::models::ValidationError;
use crate::store::{MemoryRepository, RoutineRepository, Snapshot};
use crate::streak::StreakOptions;

/// Application state: the database plus the in-memory repository built from it.
///
/// Write commands hold `writes` from the moment they read the state they
/// decide on until the repository has applied the change, so concurrent
/// commands never act on a stale read. `repo` is only ever locked briefly
/// and never across an `.await`.
pub struct AppState {
  pub db: DbPool,
  pub repo: Mutex<MemoryRepository>,
  pub options: StreakOptions,
  writes: tokio::sync::Mutex<()>,
}

impl AppState {
  pub fn new(db: DbPool, repo: MemoryRepository, options: StreakOptions) -> Self {
    Self {
      db,
      repo: Mutex::new(repo),
      options,
      writes: tokio::sync::Mutex::new(()),
    }
  }

  /// Build the repository from what is persisted in `db`
  pub async fn load(db: DbPool, options: StreakOptions) -> Result<Self, CommandError> {
    let snapshot = db::load_snapshot(&db).await?;
    tracing::info!(
      "Loaded {} routines and {} results",
      snapshot.routines.len(),
      snapshot.result_log.len()
    );
    Ok(Self::new(db, MemoryRepository::from_snapshot(snapshot), options))
  }

  /// Serialize write commands; hold the guard for the whole command
  pub(crate) async fn write_guard(&self) -> tokio::sync::MutexGuard<'_, ()> {
    self.writes.lock().await
  }

  pub fn repo(&self) -> Result<MutexGuard<'_, MemoryRepository>, CommandError> {
    self
      .repo
      .lock()
      .map_err(|e| CommandError::State(format!("Repository lock poisoned: {}", e)))
  }
}

/// ---------------------------------------------------------------------------
/// Errors
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "message")]
pub enum CommandError {
  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Invalid input: {0}")]
  InvalidInput(String),

  #[error("Storage error: {0}")]
  Storage(String),

  #[error("State error: {0}")]
  State(String),
}

impl From<StoreError> for CommandError {
  fn from(e: StoreError) -> Self {
    CommandError::Storage(e.to_string())
  }
}

impl From<ValidationError> for CommandError {
  fn from(e: ValidationError) -> Self {
    CommandError::InvalidInput(e.to_string())
  }
}

/// Parse a `yyyy-MM-dd` date argument, defaulting to today's local date
pub(crate) fn resolve_date(date: Option<&str>) -> Result<NaiveDate, CommandError> {
  match date {
    Some(key) => calendar::parse_date_key(key)
      .ok_or_else(|| CommandError::InvalidInput(format!("Invalid date: {:?}", key))),
    None => Ok(Local::now().date_naive()),
  }
}

/// ---------------------------------------------------------------------------
/// Snapshot import/export
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
  pub routines: usize,
  pub scheduled_days: usize,
  pub completed_days: usize,
  pub results: usize,
}

/// Everything as pretty-printed JSON
pub fn export_snapshot(state: &AppState) -> Result<String, CommandError> {
  let snapshot = state.repo()?.snapshot();
  serde_json::to_string_pretty(&snapshot)
    .map_err(|e| CommandError::State(format!("Failed to serialize snapshot: {}", e)))
}

/// Replace everything with `json`, keeping whatever parses
pub async fn import_snapshot(state: &AppState, json: &str) -> Result<ImportSummary, CommandError> {
  let snapshot = Snapshot::from_json_lenient(json);
  let _writing = state.write_guard().await;
  let summary = ImportSummary {
    routines: snapshot.routines.len(),
    scheduled_days: snapshot.schedule.len(),
    completed_days: snapshot.completion_history.dates().count(),
    results: snapshot.result_log.len(),
  };

  db::replace_snapshot(&state.db, &snapshot).await?;
  state.repo()?.replace(snapshot);

  tracing::info!(
    "Imported {} routines, {} scheduled days, {} completed days, {} results",
    summary.routines,
    summary.scheduled_days,
    summary.completed_days,
    summary.results
  );
  Ok(summary)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
