//! Game and competition result log
//!
//! Each record stores the routine completion rate of its date at the time it
//! was logged, which feeds the completion/win-rate correlation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{resolve_date, AppState, CommandError};
use crate::analytics::RoutineAnalytics;
use crate::db;
use crate::models::{GameOutcome, ResultRecord};
use crate::stats::{self, CorrelationBucket, RecordSummary};
use crate::store::RoutineRepository;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInput {
  pub date: String,
  pub opponent: String,
  pub my_score: u32,
  pub opponent_score: u32,
  /// Must agree with the score when given
  #[serde(default)]
  pub outcome: Option<GameOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionInput {
  pub date: String,
  pub competition_name: String,
  pub rank: u32,
  #[serde(default)]
  pub award: String,
}

/// Newest first
pub fn list_results(state: &AppState) -> Result<Vec<ResultRecord>, CommandError> {
  let mut results = state.repo()?.results().to_vec();
  results.sort_by(|a, b| b.date().cmp(&a.date()));
  Ok(results)
}

pub async fn record_game(state: &AppState, input: GameInput) -> Result<ResultRecord, CommandError> {
  let date = resolve_date(Some(&input.date))?;
  let opponent = input.opponent.trim();
  if opponent.is_empty() {
    return Err(CommandError::InvalidInput("Opponent must not be empty".into()));
  }

  let outcome = GameOutcome::from_score(input.my_score, input.opponent_score);
  if let Some(given) = input.outcome.filter(|given| *given != outcome) {
    return Err(CommandError::InvalidInput(format!(
      "Outcome {:?} does not match the score {}-{}",
      given, input.my_score, input.opponent_score
    )));
  }

  let _writing = state.write_guard().await;
  let routine_completion = day_completion(state, date)?;
  let record = ResultRecord::Game {
    id: uuid::Uuid::new_v4().to_string(),
    date,
    opponent: opponent.to_string(),
    my_score: input.my_score,
    opponent_score: input.opponent_score,
    outcome,
    routine_completion,
  };

  save(state, record).await
}

pub async fn record_competition(
  state: &AppState,
  input: CompetitionInput,
) -> Result<ResultRecord, CommandError> {
  let date = resolve_date(Some(&input.date))?;
  let name = input.competition_name.trim();
  if name.is_empty() {
    return Err(CommandError::InvalidInput("Competition name must not be empty".into()));
  }
  if input.rank == 0 {
    return Err(CommandError::InvalidInput("Rank starts at 1".into()));
  }

  let _writing = state.write_guard().await;
  let routine_completion = day_completion(state, date)?;
  let record = ResultRecord::Competition {
    id: uuid::Uuid::new_v4().to_string(),
    date,
    competition_name: name.to_string(),
    rank: input.rank,
    award: input.award.trim().to_string(),
    routine_completion,
  };

  save(state, record).await
}

pub async fn delete_result(state: &AppState, id: &str) -> Result<(), CommandError> {
  let _writing = state.write_guard().await;
  if !db::delete_result(&state.db, id).await? {
    return Err(CommandError::NotFound(format!("result {}", id)));
  }
  state.repo()?.delete_result(id);
  tracing::info!("Deleted result {}", id);
  Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
  #[serde(flatten)]
  pub summary: RecordSummary,
  pub label: String,
  /// Best competition finish, e.g. "2nd"
  pub best_rank_label: Option<String>,
  pub message: String,
  pub recent_form: Option<GameOutcome>,
}

/// Win/draw/loss record over the whole log, or over the month containing
/// `month_of` when given
pub fn get_record_summary(
  state: &AppState,
  month_of: Option<&str>,
) -> Result<RecordView, CommandError> {
  let repo = state.repo()?;
  let results = repo.results();
  let summary = match month_of {
    Some(key) => RecordSummary::for_month(results, resolve_date(Some(key))?),
    None => RecordSummary::from_results(results),
  };

  Ok(RecordView {
    label: summary.record_label(),
    best_rank_label: summary.best_rank.map(stats::ordinal),
    message: summary.win_rate_message().to_string(),
    recent_form: stats::recent_form(results),
    summary,
  })
}

pub fn get_completion_correlation(
  state: &AppState,
) -> Result<Vec<CorrelationBucket>, CommandError> {
  Ok(stats::completion_correlation(state.repo()?.results()))
}

fn day_completion(state: &AppState, date: NaiveDate) -> Result<u32, CommandError> {
  let repo = state.repo()?;
  Ok(RoutineAnalytics::with_options(&*repo, state.options).day_stat(date).rate())
}

async fn save(state: &AppState, record: ResultRecord) -> Result<ResultRecord, CommandError> {
  db::save_result(&state.db, &record).await?;
  state.repo()?.record_result(record.clone());
  tracing::info!("Recorded {} result {} on {}", record.kind_str(), record.id(), record.date());
  Ok(record)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::commands::routines::{add_routine, set_day_schedule, toggle_routine};
  use crate::models::{DaySchedule, NewRoutine, RoutineKind};
  use crate::stats::CompletionBand;
  use crate::test_utils::{setup_test_state, teardown_test_db};

  fn game(date: &str, my_score: u32, opponent_score: u32) -> GameInput {
    GameInput {
      date: date.to_string(),
      opponent: "Rivals FC".to_string(),
      my_score,
      opponent_score,
      outcome: None,
    }
  }

  #[tokio::test]
  async fn test_game_records_day_completion() {
    // Arrange: two game-day routines, one done
    let state = setup_test_state().await;
    let day = Some("2024-03-09");
    set_day_schedule(&state, day, DaySchedule::game()).await.unwrap();
    let a = add_routine(&state, NewRoutine::for_kind("Warm-up", RoutineKind::Game))
      .await
      .unwrap();
    add_routine(&state, NewRoutine::for_kind("Mobility", RoutineKind::Game))
      .await
      .unwrap();
    toggle_routine(&state, day, a.id.as_str()).await.unwrap();

    // Act
    let record = record_game(&state, game("2024-03-09", 2, 1)).await.unwrap();

    // Assert
    assert_eq!(record.routine_completion(), 50);
    assert_eq!(record.outcome(), Some(GameOutcome::Win));
    assert_eq!(db::load_snapshot(&state.db).await.unwrap().result_log, vec![record]);

    teardown_test_db(state.db).await;
  }

  #[tokio::test]
  async fn test_summary_and_correlation() {
    let state = setup_test_state().await;
    record_game(&state, game("2024-03-02", 1, 1)).await.unwrap();
    record_game(&state, game("2024-03-09", 0, 3)).await.unwrap();
    record_game(&state, game("2024-02-20", 4, 0)).await.unwrap();
    record_competition(
      &state,
      CompetitionInput {
        date: "2024-03-10".into(),
        competition_name: "Spring Open".into(),
        rank: 2,
        award: "Silver".into(),
      },
    )
    .await
    .unwrap();

    let all = get_record_summary(&state, None).unwrap();
    assert_eq!(all.label, "1W 1D 1L");
    assert_eq!(all.summary.win_rate, 33);
    assert_eq!(all.recent_form, Some(GameOutcome::Loss));

    let march = get_record_summary(&state, Some("2024-03-15")).unwrap();
    assert_eq!(march.summary.total_games, 2);
    assert_eq!(march.summary.best_rank, Some(2));
    assert_eq!(march.best_rank_label.as_deref(), Some("2nd"));
    assert_eq!(all.best_rank_label.as_deref(), Some("2nd"));

    // No routines exist, so every game sits in the empty band
    let buckets = get_completion_correlation(&state).unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].band, CompletionBand::None);
    assert_eq!(buckets[0].games, 3);

    let listed = list_results(&state).unwrap();
    assert_eq!(listed[0].kind_str(), "competition");
    assert_eq!(listed.len(), 4);

    teardown_test_db(state.db).await;
  }

  #[tokio::test]
  async fn test_validation_and_delete() {
    let state = setup_test_state().await;

    let mut blank = game("2024-03-02", 1, 0);
    blank.opponent = "  ".into();
    assert!(matches!(
      record_game(&state, blank).await,
      Err(CommandError::InvalidInput(_))
    ));
    assert!(matches!(
      record_game(&state, game("yesterday", 1, 0)).await,
      Err(CommandError::InvalidInput(_))
    ));

    // 3-0 recorded as a loss
    let mut contradicting = game("2024-03-02", 3, 0);
    contradicting.outcome = Some(GameOutcome::Loss);
    assert!(matches!(
      record_game(&state, contradicting).await,
      Err(CommandError::InvalidInput(_))
    ));

    let mut agreeing = game("2024-03-02", 1, 1);
    agreeing.outcome = Some(GameOutcome::Draw);
    let draw = record_game(&state, agreeing).await.unwrap();
    assert_eq!(draw.outcome(), Some(GameOutcome::Draw));
    delete_result(&state, draw.id()).await.unwrap();

    let record = record_game(&state, game("2024-03-02", 1, 0)).await.unwrap();
    delete_result(&state, record.id()).await.unwrap();
    assert!(list_results(&state).unwrap().is_empty());
    assert!(matches!(
      delete_result(&state, record.id()).await,
      Err(CommandError::NotFound(_))
    ));

    teardown_test_db(state.db).await;
  }
}
