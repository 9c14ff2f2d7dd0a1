//! SQLite persistence for routines, schedule flags, completions and results
//!
//! The database is the durable copy; the in-memory repository is rebuilt from
//! it at startup with `load_snapshot`. Reads never fail on bad rows, they skip
//! them with a warning.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::fs;
use std::path::Path;

use crate::calendar;
use crate::completion::CompletionHistory;
use crate::models::routine::time_of_day;
use crate::models::{
  DaySchedule, ResultRecord, RoutineDefinition, RoutineId, RoutineKind, ScheduleBook, WeekdaySet,
};
use crate::store::Snapshot;

pub type DbPool = SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration failed: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Filesystem error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// ---------------------------------------------------------------------------
/// Connection
/// ---------------------------------------------------------------------------

/// Open (creating if needed) the database file and run migrations
pub async fn initialize_db(path: &Path) -> Result<DbPool, StoreError> {
  // Create directory if it doesn't exist
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent)?;
  }

  let db_url = format!("sqlite://{}?mode=rwc", path.display());
  tracing::info!("Initializing database at: {}", path.display());

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  tracing::info!("Database initialized successfully");
  Ok(pool)
}

/// Private in-memory database with migrations applied.
///
/// A single connection, since every new in-memory connection is a separate
/// empty database.
pub async fn connect_in_memory() -> Result<DbPool, StoreError> {
  let pool = SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await?;
  sqlx::migrate!("./migrations").run(&pool).await?;
  Ok(pool)
}

/// ---------------------------------------------------------------------------
/// Loading
/// ---------------------------------------------------------------------------

pub async fn load_snapshot(pool: &DbPool) -> Result<Snapshot, StoreError> {
  let routine_rows = sqlx::query(
    r#"
    SELECT id, name, kind, recurrence_json, timer_minutes, scheduled_time, created_at
    FROM routines
    ORDER BY position ASC, created_at ASC
    "#,
  )
  .fetch_all(pool)
  .await?;

  let routines = routine_rows
    .iter()
    .filter_map(|row| match routine_from_row(row) {
      Ok(routine) => Some(routine),
      Err(reason) => {
        tracing::warn!("Skipping malformed routine row: {}", reason);
        None
      }
    })
    .collect();

  let schedule_rows = sqlx::query("SELECT date, has_training, has_game FROM day_schedules")
    .fetch_all(pool)
    .await?;

  let schedule: ScheduleBook = schedule_rows
    .iter()
    .filter_map(|row| {
      let key: String = row.try_get("date").ok()?;
      let Some(date) = calendar::parse_date_key(&key) else {
        tracing::warn!("Skipping schedule row with bad date key: {:?}", key);
        return None;
      };
      let flags = DaySchedule {
        has_training: row.try_get("has_training").unwrap_or(false),
        has_game: row.try_get("has_game").unwrap_or(false),
      };
      Some((date, flags))
    })
    .collect();

  let completion_rows = sqlx::query("SELECT date, routine_id FROM completions")
    .fetch_all(pool)
    .await?;

  let completion_history: CompletionHistory = completion_rows
    .iter()
    .filter_map(|row| {
      let key: String = row.try_get("date").ok()?;
      let id: String = row.try_get("routine_id").ok()?;
      let Some(date) = calendar::parse_date_key(&key) else {
        tracing::warn!("Skipping completion row with bad date key: {:?}", key);
        return None;
      };
      Some((date, RoutineId::new(id)))
    })
    .collect();

  let result_rows = sqlx::query(
    "SELECT id, payload_json FROM results ORDER BY date ASC, created_at ASC",
  )
  .fetch_all(pool)
  .await?;

  let result_log = result_rows
    .iter()
    .filter_map(|row| {
      let id: String = row.get("id");
      let payload: String = row.get("payload_json");
      match serde_json::from_str::<ResultRecord>(&payload) {
        Ok(record) => Some(record),
        Err(e) => {
          tracing::warn!("Skipping result {} with bad payload: {}", id, e);
          None
        }
      }
    })
    .collect();

  let snapshot = Snapshot {
    routines,
    schedule,
    completion_history,
    result_log,
  };
  tracing::debug!(
    "Loaded {} routines, {} scheduled days, {} results",
    snapshot.routines.len(),
    snapshot.schedule.len(),
    snapshot.result_log.len()
  );
  Ok(snapshot)
}

fn routine_from_row(row: &SqliteRow) -> Result<RoutineDefinition, String> {
  let id: String = row.try_get("id").map_err(|e| e.to_string())?;
  let kind_str: String = row.try_get("kind").map_err(|e| e.to_string())?;
  let kind: RoutineKind = kind_str.parse().map_err(|e| format!("{} ({})", e, id))?;

  let recurrence_json: String = row.try_get("recurrence_json").map_err(|e| e.to_string())?;
  let recurrence: WeekdaySet = serde_json::from_str(&recurrence_json)
    .map_err(|e| format!("bad recurrence for {}: {}", id, e))?;

  let timer_minutes = row
    .try_get::<Option<i64>, _>("timer_minutes")
    .ok()
    .flatten()
    .and_then(|m| u32::try_from(m).ok())
    .filter(|m| *m > 0);

  let scheduled_time = row
    .try_get::<Option<String>, _>("scheduled_time")
    .ok()
    .flatten()
    .and_then(|s| time_of_day::parse(&s));

  let created_at = row
    .try_get::<DateTime<Utc>, _>("created_at")
    .unwrap_or_else(|_| Utc::now());

  Ok(RoutineDefinition {
    name: row.try_get("name").map_err(|e| e.to_string())?,
    id: RoutineId::new(id),
    // Non-daily kinds never carry a recurrence
    recurrence: if kind == RoutineKind::Daily {
      recurrence
    } else {
      WeekdaySet::EMPTY
    },
    kind,
    timer_minutes,
    scheduled_time,
    created_at,
  })
}

/// ---------------------------------------------------------------------------
/// Writes
/// ---------------------------------------------------------------------------

/// Insert or update a routine. New routines go to the end of the list.
pub async fn save_routine(pool: &DbPool, routine: &RoutineDefinition) -> Result<(), StoreError> {
  let recurrence_json = serde_json::to_string(&routine.recurrence)?;

  sqlx::query(
    r#"
    INSERT INTO routines (
      id, name, kind, recurrence_json, timer_minutes, scheduled_time, position, created_at
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, (SELECT COALESCE(MAX(position) + 1, 0) FROM routines), ?7)
    ON CONFLICT(id) DO UPDATE SET
      name = excluded.name,
      kind = excluded.kind,
      recurrence_json = excluded.recurrence_json,
      timer_minutes = excluded.timer_minutes,
      scheduled_time = excluded.scheduled_time
    "#,
  )
  .bind(routine.id.as_str())
  .bind(&routine.name)
  .bind(routine.kind.to_string())
  .bind(recurrence_json)
  .bind(routine.timer_minutes.map(i64::from))
  .bind(routine.scheduled_time.map(|t| t.format("%H:%M").to_string()))
  .bind(routine.created_at)
  .execute(pool)
  .await?;

  tracing::debug!("Saved routine {}", routine.id);
  Ok(())
}

/// Delete a routine definition. Its completions stay in the history.
pub async fn delete_routine(pool: &DbPool, id: &RoutineId) -> Result<bool, StoreError> {
  let result = sqlx::query("DELETE FROM routines WHERE id = ?1")
    .bind(id.as_str())
    .execute(pool)
    .await?;
  Ok(result.rows_affected() > 0)
}

pub async fn save_completion(
  pool: &DbPool,
  date: NaiveDate,
  id: &RoutineId,
  completed: bool,
) -> Result<(), StoreError> {
  let query = if completed {
    "INSERT OR IGNORE INTO completions (date, routine_id) VALUES (?1, ?2)"
  } else {
    "DELETE FROM completions WHERE date = ?1 AND routine_id = ?2"
  };

  sqlx::query(query)
    .bind(calendar::date_key(date))
    .bind(id.as_str())
    .execute(pool)
    .await?;
  Ok(())
}

pub async fn save_day_schedule(
  pool: &DbPool,
  date: NaiveDate,
  schedule: DaySchedule,
) -> Result<(), StoreError> {
  sqlx::query(
    r#"
    INSERT INTO day_schedules (date, has_training, has_game)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(date) DO UPDATE SET
      has_training = excluded.has_training,
      has_game = excluded.has_game
    "#,
  )
  .bind(calendar::date_key(date))
  .bind(schedule.has_training)
  .bind(schedule.has_game)
  .execute(pool)
  .await?;
  Ok(())
}

pub async fn save_result(pool: &DbPool, record: &ResultRecord) -> Result<(), StoreError> {
  let payload = serde_json::to_string(record)?;

  sqlx::query(
    r#"
    INSERT INTO results (id, date, kind, payload_json)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(id) DO UPDATE SET
      date = excluded.date,
      kind = excluded.kind,
      payload_json = excluded.payload_json
    "#,
  )
  .bind(record.id())
  .bind(calendar::date_key(record.date()))
  .bind(record.kind_str())
  .bind(payload)
  .execute(pool)
  .await?;
  Ok(())
}

pub async fn delete_result(pool: &DbPool, id: &str) -> Result<bool, StoreError> {
  let result = sqlx::query("DELETE FROM results WHERE id = ?1")
    .bind(id)
    .execute(pool)
    .await?;
  Ok(result.rows_affected() > 0)
}

/// Replace every table with the contents of `snapshot` in one transaction.
/// A repeated routine or result id keeps its first record.
pub async fn replace_snapshot(pool: &DbPool, snapshot: &Snapshot) -> Result<(), StoreError> {
  let mut tx = pool.begin().await?;

  for table in ["routines", "day_schedules", "completions", "results"] {
    sqlx::query(&format!("DELETE FROM {}", table))
      .execute(&mut *tx)
      .await?;
  }

  for (position, routine) in snapshot.routines.iter().enumerate() {
    sqlx::query(
      r#"
      INSERT INTO routines (
        id, name, kind, recurrence_json, timer_minutes, scheduled_time, position, created_at
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
      ON CONFLICT(id) DO NOTHING
      "#,
    )
    .bind(routine.id.as_str())
    .bind(&routine.name)
    .bind(routine.kind.to_string())
    .bind(serde_json::to_string(&routine.recurrence)?)
    .bind(routine.timer_minutes.map(i64::from))
    .bind(routine.scheduled_time.map(|t| t.format("%H:%M").to_string()))
    .bind(position as i64)
    .bind(routine.created_at)
    .execute(&mut *tx)
    .await?;
  }

  for (date, flags) in snapshot.schedule.iter() {
    sqlx::query("INSERT INTO day_schedules (date, has_training, has_game) VALUES (?1, ?2, ?3)")
      .bind(calendar::date_key(date))
      .bind(flags.has_training)
      .bind(flags.has_game)
      .execute(&mut *tx)
      .await?;
  }

  for (date, id) in snapshot.completion_history.iter() {
    sqlx::query("INSERT OR IGNORE INTO completions (date, routine_id) VALUES (?1, ?2)")
      .bind(calendar::date_key(date))
      .bind(id.as_str())
      .execute(&mut *tx)
      .await?;
  }

  for record in &snapshot.result_log {
    sqlx::query(
      "INSERT OR IGNORE INTO results (id, date, kind, payload_json) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(record.id())
    .bind(calendar::date_key(record.date()))
    .bind(record.kind_str())
    .bind(serde_json::to_string(record)?)
    .execute(&mut *tx)
    .await?;
  }

  tx.commit().await?;
  tracing::info!(
    "Replaced database contents: {} routines, {} results",
    snapshot.routines.len(),
    snapshot.result_log.len()
  );
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::GameOutcome;
  use crate::test_utils::{
    date, every_day_routine, mock_competition, mock_game, mock_routine, seed_routines,
    setup_test_db, teardown_test_db,
  };

  #[tokio::test]
  async fn test_empty_database_loads_empty_snapshot() {
    let pool = setup_test_db().await;

    let snapshot = load_snapshot(&pool).await.unwrap();
    assert_eq!(snapshot, Snapshot::default());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_routines_round_trip_in_order() {
    // Arrange
    let pool = setup_test_db().await;
    let mut timed = mock_routine("t1", RoutineKind::Training);
    timed.timer_minutes = Some(15);
    timed.scheduled_time = time_of_day::parse("07:30");

    // Act
    save_routine(&pool, &every_day_routine("r1")).await.unwrap();
    save_routine(&pool, &timed).await.unwrap();
    save_routine(&pool, &every_day_routine("r0")).await.unwrap();
    let snapshot = load_snapshot(&pool).await.unwrap();

    // Assert
    let ids: Vec<_> = snapshot.routines.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "t1", "r0"]);
    assert_eq!(snapshot.routines[1], timed);
    assert_eq!(snapshot.routines[0], every_day_routine("r1"));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_update_keeps_position() {
    let pool = setup_test_db().await;
    seed_routines(&pool, &["a", "b"]).await;

    let mut renamed = every_day_routine("a");
    renamed.name = "Renamed".into();
    save_routine(&pool, &renamed).await.unwrap();

    let snapshot = load_snapshot(&pool).await.unwrap();
    assert_eq!(snapshot.routines[0].name, "Renamed");
    assert_eq!(snapshot.routines.len(), 2);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_delete_routine_keeps_completions() {
    let pool = setup_test_db().await;
    seed_routines(&pool, &["r1"]).await;
    let id = RoutineId::from("r1");
    save_completion(&pool, date("2024-03-05"), &id, true).await.unwrap();

    assert!(delete_routine(&pool, &id).await.unwrap());
    assert!(!delete_routine(&pool, &id).await.unwrap());

    let snapshot = load_snapshot(&pool).await.unwrap();
    assert!(snapshot.routines.is_empty());
    assert!(snapshot.completion_history.is_completed(date("2024-03-05"), &id));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_completion_and_schedule_writes() {
    let pool = setup_test_db().await;
    let id = RoutineId::from("r1");
    let day = date("2024-03-05");

    save_completion(&pool, day, &id, true).await.unwrap();
    save_completion(&pool, day, &id, true).await.unwrap();
    save_day_schedule(&pool, day, DaySchedule::training()).await.unwrap();
    save_day_schedule(&pool, day, DaySchedule::game()).await.unwrap();

    let snapshot = load_snapshot(&pool).await.unwrap();
    assert_eq!(snapshot.completion_history.completed_ids(day).len(), 1);
    assert_eq!(snapshot.schedule.get(day), DaySchedule::game());

    save_completion(&pool, day, &id, false).await.unwrap();
    let snapshot = load_snapshot(&pool).await.unwrap();
    assert!(snapshot.completion_history.is_empty());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_malformed_rows_are_skipped() {
    let pool = setup_test_db().await;
    seed_routines(&pool, &["good"]).await;

    sqlx::query("INSERT INTO routines (id, name, kind, position) VALUES ('bad', 'Bad', 'yoga', 9)")
      .execute(&pool)
      .await
      .unwrap();
    sqlx::query("INSERT INTO completions (date, routine_id) VALUES ('yesterday', 'good')")
      .execute(&pool)
      .await
      .unwrap();
    sqlx::query("INSERT INTO day_schedules (date, has_training) VALUES ('2024/03/05', 1)")
      .execute(&pool)
      .await
      .unwrap();
    sqlx::query(
      "INSERT INTO results (id, date, kind, payload_json) VALUES ('r', '2024-03-05', 'game', '{')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let snapshot = load_snapshot(&pool).await.unwrap();
    assert_eq!(snapshot.routines.len(), 1);
    assert!(snapshot.completion_history.is_empty());
    assert!(snapshot.schedule.is_empty());
    assert!(snapshot.result_log.is_empty());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_results_round_trip() {
    let pool = setup_test_db().await;
    let game = mock_game("g1", "2024-03-02", GameOutcome::Draw, 75);
    let competition = mock_competition("c1", "2024-03-01", 2);

    save_result(&pool, &game).await.unwrap();
    save_result(&pool, &competition).await.unwrap();

    let snapshot = load_snapshot(&pool).await.unwrap();
    assert_eq!(snapshot.result_log, vec![competition, game]);

    assert!(delete_result(&pool, "g1").await.unwrap());
    assert_eq!(load_snapshot(&pool).await.unwrap().result_log.len(), 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_replace_snapshot_overwrites_everything() {
    let pool = setup_test_db().await;
    seed_routines(&pool, &["old"]).await;
    save_completion(&pool, date("2024-03-01"), &RoutineId::from("old"), true)
      .await
      .unwrap();

    let replacement = Snapshot {
      routines: vec![every_day_routine("b"), every_day_routine("a")],
      schedule: [(date("2024-03-05"), DaySchedule::training())].into_iter().collect(),
      completion_history: [(date("2024-03-05"), RoutineId::from("a"))].into_iter().collect(),
      result_log: vec![mock_game("g1", "2024-03-05", GameOutcome::Win, 100)],
    };
    replace_snapshot(&pool, &replacement).await.unwrap();

    assert_eq!(load_snapshot(&pool).await.unwrap(), replacement);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_replace_snapshot_keeps_first_of_repeated_ids() {
    let pool = setup_test_db().await;
    let mut renamed = every_day_routine("a");
    renamed.name = "Second copy".to_string();

    let replacement = Snapshot {
      routines: vec![every_day_routine("a"), every_day_routine("b"), renamed],
      result_log: vec![
        mock_game("g1", "2024-03-05", GameOutcome::Win, 100),
        mock_game("g1", "2024-03-06", GameOutcome::Loss, 0),
      ],
      ..Snapshot::default()
    };
    replace_snapshot(&pool, &replacement).await.unwrap();

    let loaded = load_snapshot(&pool).await.unwrap();
    assert_eq!(loaded.routines, vec![every_day_routine("a"), every_day_routine("b")]);
    assert_eq!(
      loaded.result_log,
      vec![mock_game("g1", "2024-03-05", GameOutcome::Win, 100)]
    );

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_initialize_db_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("routine-log.db");

    let pool = initialize_db(&path).await.unwrap();
    save_routine(&pool, &every_day_routine("r1")).await.unwrap();
    pool.close().await;
    assert!(path.exists());

    // Reopening runs migrations again without error and keeps data
    let pool = initialize_db(&path).await.unwrap();
    assert_eq!(load_snapshot(&pool).await.unwrap().routines.len(), 1);
    pool.close().await;
  }

  #[tokio::test]
  async fn test_connect_in_memory_is_migrated() {
    let pool = connect_in_memory().await.unwrap();
    assert!(load_snapshot(&pool).await.unwrap().routines.is_empty());
  }
}
