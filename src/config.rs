//! Environment-driven configuration

use std::env;
use std::path::PathBuf;

use crate::streak::{StreakOptions, ZeroDuePolicy, DEFAULT_HORIZON_DAYS};

pub const DB_PATH_VAR: &str = "ROUTINE_LOG_DB_PATH";
pub const HORIZON_VAR: &str = "ROUTINE_LOG_STREAK_HORIZON_DAYS";
pub const ZERO_DUE_VAR: &str = "ROUTINE_LOG_ZERO_DUE_DAYS";
pub const LOG_FILTER_VAR: &str = "RUST_LOG";

const DEFAULT_DB_PATH: &str = "routine-log.db";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("Invalid value for {key}: {value:?}")]
  Invalid { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
  pub db_path: PathBuf,
  pub streak: StreakOptions,
  pub log_filter: String,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      db_path: PathBuf::from(DEFAULT_DB_PATH),
      streak: StreakOptions::default(),
      log_filter: DEFAULT_LOG_FILTER.to_string(),
    }
  }
}

impl AppConfig {
  /// Read configuration from the process environment.
  ///
  /// Call `dotenvy::dotenv()` first to pick up a `.env` file. Unset variables
  /// fall back to defaults; set-but-invalid values are errors.
  pub fn from_env() -> Result<Self, ConfigError> {
    let db_path = env::var(DB_PATH_VAR)
      .ok()
      .filter(|v| !v.trim().is_empty())
      .map(PathBuf::from)
      .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

    let horizon_days = match env::var(HORIZON_VAR) {
      Ok(raw) => raw
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| invalid(HORIZON_VAR, &raw))?,
      Err(_) => DEFAULT_HORIZON_DAYS,
    };

    let zero_due = match env::var(ZERO_DUE_VAR) {
      Ok(raw) => raw
        .trim()
        .to_lowercase()
        .parse::<ZeroDuePolicy>()
        .map_err(|_| invalid(ZERO_DUE_VAR, &raw))?,
      Err(_) => ZeroDuePolicy::default(),
    };

    let log_filter = env::var(LOG_FILTER_VAR).unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

    Ok(Self {
      db_path,
      streak: StreakOptions {
        horizon_days,
        zero_due,
      },
      log_filter,
    })
  }
}

fn invalid(key: &str, value: &str) -> ConfigError {
  ConfigError::Invalid {
    key: key.to_string(),
    value: value.to_string(),
  }
}
