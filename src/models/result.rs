use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Outcome of a head-to-head game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
  #[serde(alias = "승")]
  Win,
  #[serde(alias = "패")]
  Loss,
  #[serde(alias = "무")]
  Draw,
}

impl GameOutcome {
  /// Derive the outcome from a final score
  pub fn from_score(my_score: u32, opponent_score: u32) -> Self {
    match my_score.cmp(&opponent_score) {
      std::cmp::Ordering::Greater => Self::Win,
      std::cmp::Ordering::Less => Self::Loss,
      std::cmp::Ordering::Equal => Self::Draw,
    }
  }
}

/// One entry of the game/competition result log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultRecord {
  #[serde(rename_all = "camelCase")]
  Game {
    id: String,
    date: NaiveDate,
    opponent: String,
    #[serde(default)]
    my_score: u32,
    #[serde(default)]
    opponent_score: u32,
    #[serde(rename = "result")]
    outcome: GameOutcome,
    /// Completion rate (0-100) of the game day when the result was logged
    #[serde(default)]
    routine_completion: u32,
  },
  #[serde(rename_all = "camelCase")]
  Competition {
    id: String,
    date: NaiveDate,
    competition_name: String,
    rank: u32,
    #[serde(default)]
    award: String,
    #[serde(default)]
    routine_completion: u32,
  },
}

impl ResultRecord {
  pub fn id(&self) -> &str {
    match self {
      Self::Game { id, .. } | Self::Competition { id, .. } => id,
    }
  }

  pub fn date(&self) -> NaiveDate {
    match self {
      Self::Game { date, .. } | Self::Competition { date, .. } => *date,
    }
  }

  pub fn routine_completion(&self) -> u32 {
    match self {
      Self::Game {
        routine_completion, ..
      }
      | Self::Competition {
        routine_completion, ..
      } => *routine_completion,
    }
  }

  /// Game outcome; competitions have no win/loss/draw
  pub fn outcome(&self) -> Option<GameOutcome> {
    match self {
      Self::Game { outcome, .. } => Some(*outcome),
      Self::Competition { .. } => None,
    }
  }

  pub fn kind_str(&self) -> &'static str {
    match self {
      Self::Game { .. } => "game",
      Self::Competition { .. } => "competition",
    }
  }
}
