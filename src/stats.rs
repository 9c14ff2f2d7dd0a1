//! Stats projection: turns day stats, streaks and the result log into the
//! values dashboards show
//!
//! Nothing here aggregates completion data on its own; every number comes
//! from `aggregate` or `streak`. The result log is a separate, simpler count.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::aggregate::{self, day_stat, window_stat, AnalyticsInput, DayStat, PeriodStat};
use crate::calendar;
use crate::models::{GameOutcome, ResultRecord};
use crate::streak::{self, DayStatus, StreakOptions, StreakState};

/// Length of the calendar strip on the streak report
pub const RECENT_STRIP_DAYS: u32 = 28;

/// Streak milestones, in ascending order
pub const MILESTONES: [u32; 4] = [7, 30, 100, 365];

/// ---------------------------------------------------------------------------
/// Labels and Bands
/// ---------------------------------------------------------------------------

/// Coarse rating of a completion rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionBand {
  Excellent, // >= 80
  Good,      // >= 60
  Fair,      // >= 40
  Low,       // > 0
  None,
}

impl CompletionBand {
  pub const ALL: [CompletionBand; 5] = [
    CompletionBand::Excellent,
    CompletionBand::Good,
    CompletionBand::Fair,
    CompletionBand::Low,
    CompletionBand::None,
  ];

  pub fn from_rate(rate: u32) -> Self {
    match rate {
      r if r >= 80 => CompletionBand::Excellent,
      r if r >= 60 => CompletionBand::Good,
      r if r >= 40 => CompletionBand::Fair,
      r if r > 0 => CompletionBand::Low,
      _ => CompletionBand::None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      CompletionBand::Excellent => "excellent",
      CompletionBand::Good => "good",
      CompletionBand::Fair => "fair",
      CompletionBand::Low => "low",
      CompletionBand::None => "none",
    }
  }
}

pub fn percent_label(rate: u32) -> String {
  format!("{}%", rate)
}

/// English ordinal: 1st, 2nd, 3rd, 4th, 11th, 21st ...
pub fn ordinal(n: u32) -> String {
  let suffix = match (n % 10, n % 100) {
    (_, 11..=13) => "th",
    (1, _) => "st",
    (2, _) => "nd",
    (3, _) => "rd",
    _ => "th",
  };
  format!("{}{}", n, suffix)
}

pub fn days_label(n: u32) -> String {
  if n == 1 {
    "1 day".to_string()
  } else {
    format!("{} days", n)
  }
}

pub fn streak_message(current: u32) -> &'static str {
  match current {
    0 => "Complete your first routine to start a streak!",
    c if c < 7 => "Good start! Keep it going!",
    c if c < 30 => "Great work! The habit is taking hold.",
    c if c < 100 => "Amazing! You are a true champion.",
    _ => "Legendary! Your consistency is paying off.",
  }
}

pub fn weekly_message(average: u32) -> &'static str {
  match average {
    a if a >= 80 => "Excellent! You are keeping up your routines this week.",
    a if a >= 60 => "Doing well! Push a little more.",
    a if a > 0 => "Try to complete more routines. Small changes make a big difference.",
    _ => "Start your first routine!",
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
  pub target: u32,
  pub remaining: u32,
}

/// The smallest milestone not yet reached, or None past the last one
pub fn next_milestone(current: u32) -> Option<Milestone> {
  MILESTONES
    .iter()
    .find(|&&target| target > current)
    .map(|&target| Milestone {
      target,
      remaining: target - current,
    })
}

/// ---------------------------------------------------------------------------
/// Result Log Summary
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordSummary {
  pub wins: u32,
  pub losses: u32,
  pub draws: u32,
  pub total_games: u32,
  /// Rounded percentage of games won (draws count as games)
  pub win_rate: u32,
  pub competitions: u32,
  pub best_rank: Option<u32>,
}

impl RecordSummary {
  pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ResultRecord>) -> Self {
    let mut summary = Self::default();
    for record in results {
      match record {
        ResultRecord::Game { outcome, .. } => {
          summary.total_games += 1;
          match outcome {
            GameOutcome::Win => summary.wins += 1,
            GameOutcome::Loss => summary.losses += 1,
            GameOutcome::Draw => summary.draws += 1,
          }
        }
        ResultRecord::Competition { rank, .. } => {
          summary.competitions += 1;
          summary.best_rank = Some(summary.best_rank.map_or(*rank, |best| best.min(*rank)));
        }
      }
    }
    summary.win_rate = aggregate::rate(summary.total_games, summary.wins);
    summary
  }

  /// Results dated in the calendar month of `today`
  pub fn for_month(results: &[ResultRecord], today: NaiveDate) -> Self {
    Self::from_results(results.iter().filter(|r| {
      let d = r.date();
      d.year() == today.year() && d.month() == today.month()
    }))
  }

  /// Compact "3W 1D 2L" label
  pub fn record_label(&self) -> String {
    format!("{}W {}D {}L", self.wins, self.draws, self.losses)
  }

  pub fn win_rate_message(&self) -> &'static str {
    match self.win_rate {
      _ if self.total_games == 0 => "Add a game to see your record",
      r if r >= 60 => "Excellent record",
      r if r >= 40 => "Above average",
      _ => "Room to improve",
    }
  }
}

/// Outcome of the most recent game, if any
pub fn recent_form(results: &[ResultRecord]) -> Option<GameOutcome> {
  results
    .iter()
    .filter(|r| r.outcome().is_some())
    .max_by_key(|r| r.date())
    .and_then(|r| r.outcome())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationBucket {
  pub band: CompletionBand,
  pub games: u32,
  pub wins: u32,
  pub win_rate: u32,
}

/// Game win rate grouped by the routine completion of each game day.
///
/// Only bands with at least one game are returned, best band first.
pub fn completion_correlation(results: &[ResultRecord]) -> Vec<CorrelationBucket> {
  CompletionBand::ALL
    .iter()
    .filter_map(|&band| {
      let games: Vec<_> = results
        .iter()
        .filter(|r| r.outcome().is_some())
        .filter(|r| CompletionBand::from_rate(r.routine_completion()) == band)
        .collect();
      if games.is_empty() {
        return None;
      }
      let wins = games
        .iter()
        .filter(|r| r.outcome() == Some(GameOutcome::Win))
        .count() as u32;
      let total = games.len() as u32;
      Some(CorrelationBucket {
        band,
        games: total,
        wins,
        win_rate: aggregate::rate(total, wins),
      })
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Dashboard
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
  pub date: NaiveDate,
  pub today: DayStat,
  /// Completion of the current ISO week up to and including today
  pub weekly_completion: u32,
  pub current_streak: u32,
  pub month_record: RecordSummary,
  pub month_record_label: String,
  pub total_routines: usize,
}

pub fn build_dashboard(
  today: NaiveDate,
  input: &AnalyticsInput,
  results: &[ResultRecord],
  options: StreakOptions,
) -> DashboardStats {
  let week = calendar::clamp_to_today(&calendar::week_dates(today), today);
  let month_record = RecordSummary::for_month(results, today);
  DashboardStats {
    date: today,
    today: day_stat(today, input),
    weekly_completion: aggregate::window_rate(&week, input),
    current_streak: streak::compute_streak(today, input, options).current,
    month_record_label: month_record.record_label(),
    month_record,
    total_routines: input.routines.len(),
  }
}

/// ---------------------------------------------------------------------------
/// Weekly Report
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayStat {
  pub weekday: Weekday,
  pub label: String,
  pub date: NaiveDate,
  pub stat: DayStat,
  pub rate: u32,
  pub band: CompletionBand,
  /// Day is after today; excluded from every average
  pub upcoming: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Insight {
  BestDay { weekday: Weekday, rate: u32 },
  WeekendBelowWeekday { weekend: u32, weekday: u32 },
  KeepPace,
  DoMoreEachDay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReport {
  pub week_start: NaiveDate,
  pub days: Vec<WeekdayStat>,
  pub average: u32,
  pub average_label: String,
  pub message: String,
  pub best_day: Option<Weekday>,
  pub weekday_average: u32,
  pub weekend_average: u32,
  pub insights: Vec<Insight>,
}

pub fn build_weekly_report(today: NaiveDate, input: &AnalyticsInput) -> WeeklyReport {
  let days: Vec<WeekdayStat> = calendar::week_dates(today)
    .into_iter()
    .map(|date| {
      let stat = day_stat(date, input);
      WeekdayStat {
        weekday: date.weekday(),
        label: calendar::weekday_label(date.weekday()).to_string(),
        date,
        stat,
        rate: stat.rate(),
        band: CompletionBand::from_rate(stat.rate()),
        upcoming: date > today,
      }
    })
    .collect();

  let elapsed = || days.iter().filter(|d| !d.upcoming);
  let average = elapsed().map(|d| d.stat).sum::<DayStat>().rate();
  let weekday_average = elapsed()
    .filter(|d| !calendar::is_weekend(d.weekday))
    .map(|d| d.stat)
    .sum::<DayStat>()
    .rate();
  let weekend_average = elapsed()
    .filter(|d| calendar::is_weekend(d.weekday))
    .map(|d| d.stat)
    .sum::<DayStat>()
    .rate();

  // First strictly-best day wins ties
  let best = elapsed()
    .filter(|d| d.stat.due > 0)
    .fold(None::<&WeekdayStat>, |best, d| match best {
      Some(b) if b.rate >= d.rate => Some(b),
      _ => Some(d),
    });

  let mut insights = Vec::new();
  if average > 0 {
    if let Some(b) = best {
      insights.push(Insight::BestDay {
        weekday: b.weekday,
        rate: b.rate,
      });
    }
    if weekend_average > 0 && weekend_average < weekday_average {
      insights.push(Insight::WeekendBelowWeekday {
        weekend: weekend_average,
        weekday: weekday_average,
      });
    }
    insights.push(if average >= 80 {
      Insight::KeepPace
    } else {
      Insight::DoMoreEachDay
    });
  }

  WeeklyReport {
    week_start: calendar::week_start(today),
    best_day: best.map(|b| b.weekday),
    days,
    average,
    average_label: percent_label(average),
    message: weekly_message(average).to_string(),
    weekday_average,
    weekend_average,
    insights,
  }
}

/// ---------------------------------------------------------------------------
/// Streak Report
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakReport {
  #[serde(flatten)]
  pub state: StreakState,
  /// "1 day", "12 days"
  pub current_label: String,
  pub longest_label: String,
  /// Current streak as a share of all fully completed days
  pub consistency: u32,
  pub message: String,
  pub next_milestone: Option<Milestone>,
  pub recent: Vec<DayStatus>,
}

pub fn build_streak_report(
  today: NaiveDate,
  input: &AnalyticsInput,
  options: StreakOptions,
) -> StreakReport {
  let state = streak::compute_streak(today, input, options);
  StreakReport {
    current_label: days_label(state.current),
    longest_label: days_label(state.longest),
    consistency: aggregate::rate(state.total_fully_completed_days, state.current),
    message: streak_message(state.current).to_string(),
    next_milestone: next_milestone(state.current),
    recent: streak::recent_days(today, RECENT_STRIP_DAYS, input),
    state,
  }
}

/// ---------------------------------------------------------------------------
/// Monthly Report
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthWeekRow {
  pub label: String,
  pub start: NaiveDate,
  pub end: NaiveDate,
  pub stat: DayStat,
  pub rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
  pub month_start: NaiveDate,
  /// ISO weeks overlapping the month, trimmed to the month and to today
  pub weeks: Vec<MonthWeekRow>,
  pub month_rate: u32,
  /// Mean of the weekly rates, skipping weeks with nothing due
  pub weekly_average: u32,
}

pub fn build_monthly_report(today: NaiveDate, input: &AnalyticsInput) -> MonthlyReport {
  let month = calendar::clamp_to_today(&calendar::month_dates(today), today);

  let mut chunks: Vec<Vec<NaiveDate>> = Vec::new();
  for date in &month {
    match chunks.last_mut() {
      Some(chunk) if calendar::week_start(chunk[0]) == calendar::week_start(*date) => {
        chunk.push(*date)
      }
      _ => chunks.push(vec![*date]),
    }
  }

  let weeks: Vec<MonthWeekRow> = chunks
    .iter()
    .enumerate()
    .map(|(i, dates)| {
      let stat = window_stat(dates, input);
      MonthWeekRow {
        label: format!("Week {}", i + 1),
        start: dates[0],
        end: dates[dates.len() - 1],
        stat,
        rate: stat.rate(),
      }
    })
    .collect();

  let stats: Vec<DayStat> = weeks.iter().map(|w| w.stat).collect();
  MonthlyReport {
    month_start: calendar::month_start(today),
    month_rate: aggregate::window_rate(&month, input),
    weekly_average: aggregate::window_average(&stats),
    weeks,
  }
}

/// ---------------------------------------------------------------------------
/// Success Rate Series
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesPeriod {
  Daily,
  Weekly,
  Monthly,
}

impl SeriesPeriod {
  /// Number of points charted for this period
  pub fn default_len(&self) -> u32 {
    match self {
      SeriesPeriod::Daily => 7,
      SeriesPeriod::Weekly => 4,
      SeriesPeriod::Monthly => 4,
    }
  }
}

impl std::fmt::Display for SeriesPeriod {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SeriesPeriod::Daily => write!(f, "daily"),
      SeriesPeriod::Weekly => write!(f, "weekly"),
      SeriesPeriod::Monthly => write!(f, "monthly"),
    }
  }
}

impl std::str::FromStr for SeriesPeriod {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "daily" => Ok(SeriesPeriod::Daily),
      "weekly" => Ok(SeriesPeriod::Weekly),
      "monthly" => Ok(SeriesPeriod::Monthly),
      _ => Err(format!("Unknown series period: {}", s)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
  pub label: String,
  pub start: NaiveDate,
  pub end: NaiveDate,
  pub rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSeries {
  pub period: SeriesPeriod,
  pub points: Vec<SeriesPoint>,
}

pub fn build_rate_series(
  today: NaiveDate,
  period: SeriesPeriod,
  input: &AnalyticsInput,
) -> RateSeries {
  let len = period.default_len();
  let periods: Vec<PeriodStat> = match period {
    SeriesPeriod::Daily => aggregate::daily_series(today, len, input),
    SeriesPeriod::Weekly => aggregate::weekly_series(today, len, input),
    SeriesPeriod::Monthly => aggregate::monthly_series(today, len, input),
  };

  let points = periods
    .into_iter()
    .map(|p| SeriesPoint {
      label: match period {
        SeriesPeriod::Daily => calendar::weekday_label(p.start.weekday()).to_string(),
        SeriesPeriod::Weekly => format!("W{}", p.start.iso_week().week()),
        SeriesPeriod::Monthly => p.start.format("%b").to_string(),
      },
      start: p.start,
      end: p.end,
      rate: p.rate(),
    })
    .collect();

  RateSeries { period, points }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
