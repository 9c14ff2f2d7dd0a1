pub mod aggregate;
pub mod analytics;
pub mod calendar;
pub mod commands;
pub mod completion;
pub mod config;
pub mod db;
pub mod due;
pub mod models;
pub mod stats;
pub mod store;
pub mod streak;

#[cfg(test)]
mod test_utils;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::commands::AppState;
use crate::config::AppConfig;
use crate::stats::{DashboardStats, MonthlyReport, StreakReport, WeeklyReport};

/// Today's reports, as printed by the binary
#[derive(Debug, Serialize)]
pub struct TodayReport {
  pub dashboard: DashboardStats,
  pub weekly: WeeklyReport,
  pub streak: StreakReport,
  pub monthly: MonthlyReport,
}

pub fn build_today_report(state: &AppState) -> Result<TodayReport, commands::CommandError> {
  Ok(TodayReport {
    dashboard: commands::stats::get_dashboard_stats(state, None)?,
    weekly: commands::stats::get_weekly_report(state, None)?,
    streak: commands::stats::get_streak_report(state, None)?,
    monthly: commands::stats::get_monthly_report(state, None)?,
  })
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  let config = AppConfig::from_env()?;

  // Logs go to stderr so stdout stays valid JSON
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::new(&config.log_filter))
    .with_writer(std::io::stderr)
    .init();

  let pool = db::initialize_db(&config.db_path).await?;
  let state = AppState::load(pool, config.streak).await?;

  let report = build_today_report(&state)?;
  println!("{}", serde_json::to_string_pretty(&report)?);

  state.db.close().await;
  Ok(())
}
