//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database and application state setup/teardown
//! - Mock routine and result factories
//! - Date helpers

use chrono::{DateTime, NaiveDate, TimeZone, Utc, Weekday};
use sqlx::SqlitePool;

use crate::calendar;
use crate::commands::AppState;
use crate::db;
use crate::models::{
  GameOutcome, ResultRecord, RoutineDefinition, RoutineId, RoutineKind, WeekdaySet,
};
use crate::store::MemoryRepository;
use crate::streak::StreakOptions;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
pub async fn setup_test_db() -> SqlitePool {
  db::connect_in_memory()
    .await
    .expect("Failed to create in-memory database")
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Empty application state backed by a fresh in-memory database
pub async fn setup_test_state() -> AppState {
  AppState::new(
    setup_test_db().await,
    MemoryRepository::new(),
    StreakOptions::default(),
  )
}

/// Seed every-day routines straight into the database, in order
pub async fn seed_routines(pool: &SqlitePool, ids: &[&str]) {
  let recurrence_json =
    serde_json::to_string(&WeekdaySet::ALL).expect("Failed to serialize recurrence");

  for (position, id) in ids.iter().enumerate() {
    sqlx::query(
      r#"
      INSERT INTO routines (id, name, kind, recurrence_json, position, created_at)
      VALUES (?1, ?2, 'daily', ?3, ?4, ?5)
      "#,
    )
    .bind(*id)
    .bind(format!("Routine {}", id))
    .bind(&recurrence_json)
    .bind(position as i64)
    .bind(fixed_created_at())
    .execute(pool)
    .await
    .expect("Failed to insert test routine");
  }
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

fn fixed_created_at() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
}

/// A daily routine recurring on `days`, with a fixed id and timestamp
pub fn mock_daily_routine(id: &str, days: &[Weekday]) -> RoutineDefinition {
  RoutineDefinition {
    id: RoutineId::from(id),
    name: format!("Routine {}", id),
    kind: RoutineKind::Daily,
    recurrence: WeekdaySet::from_weekdays(days),
    timer_minutes: None,
    scheduled_time: None,
    created_at: fixed_created_at(),
  }
}

/// A daily routine due on all seven weekdays
pub fn every_day_routine(id: &str) -> RoutineDefinition {
  mock_daily_routine(id, &calendar::weekdays())
}

/// A routine of any kind; non-daily kinds get an empty recurrence
pub fn mock_routine(id: &str, kind: RoutineKind) -> RoutineDefinition {
  let mut routine = mock_daily_routine(id, &[]);
  routine.kind = kind;
  if kind == RoutineKind::Daily {
    routine.recurrence = WeekdaySet::ALL;
  }
  routine
}

pub fn mock_game(id: &str, day: &str, outcome: GameOutcome, completion: u32) -> ResultRecord {
  ResultRecord::Game {
    id: id.to_string(),
    date: date(day),
    opponent: "Test Opponent".to_string(),
    my_score: 0,
    opponent_score: 0,
    outcome,
    routine_completion: completion,
  }
}

pub fn mock_competition(id: &str, day: &str, rank: u32) -> ResultRecord {
  ResultRecord::Competition {
    id: id.to_string(),
    date: date(day),
    competition_name: "Test Open".to_string(),
    rank,
    award: String::new(),
    routine_completion: 0,
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Parse a `yyyy-MM-dd` literal
pub fn date(key: &str) -> NaiveDate {
  calendar::parse_date_key(key).unwrap_or_else(|| panic!("bad test date: {}", key))
}
