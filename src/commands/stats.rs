//! Dashboard and report commands. `date` defaults to today's local date.

use super::{resolve_date, AppState, CommandError};
use crate::analytics::RoutineAnalytics;
use crate::stats::{
  DashboardStats, MonthlyReport, RateSeries, SeriesPeriod, StreakReport, WeeklyReport,
};

pub fn get_dashboard_stats(
  state: &AppState,
  date: Option<&str>,
) -> Result<DashboardStats, CommandError> {
  let today = resolve_date(date)?;
  let repo = state.repo()?;
  Ok(RoutineAnalytics::with_options(&*repo, state.options).dashboard(today))
}

pub fn get_weekly_report(
  state: &AppState,
  date: Option<&str>,
) -> Result<WeeklyReport, CommandError> {
  let today = resolve_date(date)?;
  let repo = state.repo()?;
  Ok(RoutineAnalytics::with_options(&*repo, state.options).weekly_report(today))
}

pub fn get_streak_report(
  state: &AppState,
  date: Option<&str>,
) -> Result<StreakReport, CommandError> {
  let today = resolve_date(date)?;
  let repo = state.repo()?;
  Ok(RoutineAnalytics::with_options(&*repo, state.options).streak_report(today))
}

pub fn get_monthly_report(
  state: &AppState,
  date: Option<&str>,
) -> Result<MonthlyReport, CommandError> {
  let today = resolve_date(date)?;
  let repo = state.repo()?;
  Ok(RoutineAnalytics::with_options(&*repo, state.options).monthly_report(today))
}

/// Success-rate chart data; `period` is `daily`, `weekly` or `monthly`
pub fn get_rate_series(
  state: &AppState,
  period: &str,
  date: Option<&str>,
) -> Result<RateSeries, CommandError> {
  let period: SeriesPeriod = period.parse().map_err(CommandError::InvalidInput)?;
  let today = resolve_date(date)?;
  let repo = state.repo()?;
  Ok(RoutineAnalytics::with_options(&*repo, state.options).rate_series(today, period))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::commands::routines::{add_routine, complete_timed_routine, toggle_routine};
  use crate::models::NewRoutine;
  use crate::test_utils::{date, setup_test_state, teardown_test_db};
  use chrono::Weekday;

  const ALL_WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
  ];

  #[tokio::test]
  async fn test_reports_follow_completions() {
    // Arrange: one every-day routine completed Mon..Wed of 2024-03-04
    let state = setup_test_state().await;
    let routine = add_routine(&state, NewRoutine::daily("Journal", &ALL_WEEK))
      .await
      .unwrap();
    for day in ["2024-03-04", "2024-03-05", "2024-03-06"] {
      toggle_routine(&state, Some(day), routine.id.as_str())
        .await
        .unwrap();
    }
    let today = Some("2024-03-07");

    // Act
    let dashboard = get_dashboard_stats(&state, today).unwrap();
    let weekly = get_weekly_report(&state, today).unwrap();
    let streak = get_streak_report(&state, today).unwrap();
    let monthly = get_monthly_report(&state, today).unwrap();

    // Assert: Thursday is still in progress
    assert_eq!(dashboard.current_streak, 3);
    assert_eq!(dashboard.weekly_completion, 75);
    assert_eq!(weekly.week_start, date("2024-03-04"));
    assert_eq!(weekly.average, 75);
    assert_eq!(streak.state.longest, 3);
    assert_eq!(streak.consistency, 100);
    assert_eq!(monthly.month_rate, 43); // 3 of 7 days

    teardown_test_db(state.db).await;
  }

  #[tokio::test]
  async fn test_timer_completion_counts_toward_streak() {
    let state = setup_test_state().await;
    let mut input = NewRoutine::daily("Breathing", &ALL_WEEK);
    input.timer_minutes = Some(1);
    let routine = add_routine(&state, input).await.unwrap();

    complete_timed_routine(&state, Some("2024-03-05"), routine.id.as_str(), 60)
      .await
      .unwrap();

    let streak = get_streak_report(&state, Some("2024-03-05")).unwrap();
    assert_eq!(streak.state.current, 1);
  }

  #[tokio::test]
  async fn test_rate_series_period_validation() {
    let state = setup_test_state().await;

    let series = get_rate_series(&state, "monthly", Some("2024-03-07")).unwrap();
    assert_eq!(series.points.len(), 4);
    assert!(matches!(
      get_rate_series(&state, "yearly", None),
      Err(CommandError::InvalidInput(_))
    ));
    assert!(matches!(
      get_weekly_report(&state, Some("next week")),
      Err(CommandError::InvalidInput(_))
    ));

    teardown_test_db(state.db).await;
  }
}
