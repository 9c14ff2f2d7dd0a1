//! Rate aggregation over days, ISO weeks and calendar months
//!
//! Every rate in the crate is derived here. Completed counts are always the
//! intersection of the day's due set with its completed ids, so a completion
//! whose routine is no longer due (flag cleared, recurrence edited, routine
//! deleted) never inflates a rate.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::Add;

use crate::calendar;
use crate::completion::CompletionHistory;
use crate::due::due_set;
use crate::models::{RoutineDefinition, ScheduleBook};

/// ---------------------------------------------------------------------------
/// Inputs
/// ---------------------------------------------------------------------------

/// Borrowed view of the three inputs every aggregation reads
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsInput<'a> {
  pub routines: &'a [RoutineDefinition],
  pub schedule: &'a ScheduleBook,
  pub history: &'a CompletionHistory,
}

impl<'a> AnalyticsInput<'a> {
  pub fn new(
    routines: &'a [RoutineDefinition],
    schedule: &'a ScheduleBook,
    history: &'a CompletionHistory,
  ) -> Self {
    Self {
      routines,
      schedule,
      history,
    }
  }

  pub fn due_set(&self, date: NaiveDate) -> Vec<&'a RoutineDefinition> {
    due_set(self.routines, date, self.schedule.get(date))
  }
}

/// ---------------------------------------------------------------------------
/// Day Stat
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DayStat {
  pub due: u32,
  pub completed: u32,
}

impl DayStat {
  pub fn new(due: u32, completed: u32) -> Self {
    Self { due, completed }
  }

  pub fn rate(&self) -> u32 {
    rate(self.due, self.completed)
  }

  /// Something was due and all of it was done
  pub fn is_fully_completed(&self) -> bool {
    self.due > 0 && self.completed == self.due
  }
}

impl Add for DayStat {
  type Output = DayStat;

  fn add(self, other: DayStat) -> DayStat {
    DayStat {
      due: self.due + other.due,
      completed: self.completed + other.completed,
    }
  }
}

impl Sum for DayStat {
  fn sum<I: Iterator<Item = DayStat>>(iter: I) -> DayStat {
    iter.fold(DayStat::default(), Add::add)
  }
}

/// Completion percentage, rounded half up. Zero due is a defined 0.
pub fn rate(due: u32, completed: u32) -> u32 {
  if due == 0 {
    return 0;
  }
  (100.0 * completed as f64 / due as f64).round() as u32
}

/// Due and completed counts for one date
pub fn day_stat(date: NaiveDate, input: &AnalyticsInput) -> DayStat {
  let due = input.due_set(date);
  let completed = due
    .iter()
    .filter(|r| input.history.is_completed(date, &r.id))
    .count();

  DayStat {
    due: due.len() as u32,
    completed: completed as u32,
  }
}

/// Summed counts across `dates`
pub fn window_stat(dates: &[NaiveDate], input: &AnalyticsInput) -> DayStat {
  dates.iter().map(|d| day_stat(*d, input)).sum()
}

/// Single-division rate over a window: sum first, divide once.
///
/// Days with nothing due add (0, 0) and so cannot skew the ratio.
pub fn window_rate(dates: &[NaiveDate], input: &AnalyticsInput) -> u32 {
  window_stat(dates, input).rate()
}

/// Mean of per-period rates, counting only periods that had something due.
/// An all-empty window averages to 0.
pub fn window_average(periods: &[DayStat]) -> u32 {
  let rates: Vec<f64> = periods
    .iter()
    .filter(|p| p.due > 0)
    .map(|p| p.rate() as f64)
    .collect();

  if rates.is_empty() {
    return 0;
  }
  (rates.iter().sum::<f64>() / rates.len() as f64).round() as u32
}

/// ---------------------------------------------------------------------------
/// Period Rollups
/// ---------------------------------------------------------------------------

/// Aggregated counts for a contiguous date range (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodStat {
  pub start: NaiveDate,
  pub end: NaiveDate,
  pub stat: DayStat,
}

impl PeriodStat {
  pub fn rate(&self) -> u32 {
    self.stat.rate()
  }

  fn over(dates: &[NaiveDate], input: &AnalyticsInput) -> Option<Self> {
    let (first, last) = (dates.first()?, dates.last()?);
    Some(Self {
      start: *first,
      end: *last,
      stat: window_stat(dates, input),
    })
  }
}

/// One entry per day for the last `days` days, oldest first
pub fn daily_series(today: NaiveDate, days: u32, input: &AnalyticsInput) -> Vec<PeriodStat> {
  let mut dates: Vec<NaiveDate> = calendar::days_back(today, days).collect();
  dates.reverse();
  dates
    .into_iter()
    .map(|d| PeriodStat {
      start: d,
      end: d,
      stat: day_stat(d, input),
    })
    .collect()
}

/// One entry per ISO week for the last `weeks` weeks (current week to date),
/// oldest first
pub fn weekly_series(today: NaiveDate, weeks: u32, input: &AnalyticsInput) -> Vec<PeriodStat> {
  let current = calendar::week_start(today);
  (0..weeks as i64)
    .rev()
    .filter_map(|back| {
      let anchor = current - Duration::weeks(back);
      let dates = calendar::clamp_to_today(&calendar::week_dates(anchor), today);
      PeriodStat::over(&dates, input)
    })
    .collect()
}

/// One entry per calendar month for the last `months` months (current month
/// to date), oldest first
pub fn monthly_series(today: NaiveDate, months: u32, input: &AnalyticsInput) -> Vec<PeriodStat> {
  (0..months)
    .rev()
    .filter_map(|back| {
      let anchor = calendar::months_before(today, back);
      let dates = calendar::clamp_to_today(&calendar::month_dates(anchor), today);
      PeriodStat::over(&dates, input)
    })
    .collect()
}
