//! Analytics over a routine repository
//!
//! Single entry point for every consumer: due sets, day stats, window rates,
//! streaks and the dashboard reports all go through [`RoutineAnalytics`] so
//! nothing re-derives due-ness on its own. Results are recomputed from the
//! repository on every call.

use chrono::NaiveDate;

use crate::aggregate::{self, AnalyticsInput, DayStat};
use crate::models::RoutineDefinition;
use crate::stats::{
  self, DashboardStats, MonthlyReport, RateSeries, SeriesPeriod, StreakReport, WeeklyReport,
};
use crate::store::RoutineRepository;
use crate::streak::{self, StreakOptions, StreakState};

pub struct RoutineAnalytics<'r, R: RoutineRepository + ?Sized> {
  repo: &'r R,
  options: StreakOptions,
}

impl<'r, R: RoutineRepository + ?Sized> RoutineAnalytics<'r, R> {
  pub fn new(repo: &'r R) -> Self {
    Self {
      repo,
      options: StreakOptions::default(),
    }
  }

  pub fn with_options(repo: &'r R, options: StreakOptions) -> Self {
    Self { repo, options }
  }

  fn input(&self) -> AnalyticsInput<'r> {
    AnalyticsInput::new(self.repo.routines(), self.repo.schedule(), self.repo.history())
  }

  pub fn due_set_for(&self, date: NaiveDate) -> Vec<&'r RoutineDefinition> {
    self.input().due_set(date)
  }

  pub fn day_stat(&self, date: NaiveDate) -> DayStat {
    aggregate::day_stat(date, &self.input())
  }

  pub fn window_rate(&self, dates: &[NaiveDate]) -> u32 {
    aggregate::window_rate(dates, &self.input())
  }

  pub fn compute_streak(&self, today: NaiveDate) -> StreakState {
    streak::compute_streak(today, &self.input(), self.options)
  }

  pub fn dashboard(&self, today: NaiveDate) -> DashboardStats {
    stats::build_dashboard(today, &self.input(), self.repo.results(), self.options)
  }

  pub fn weekly_report(&self, today: NaiveDate) -> WeeklyReport {
    stats::build_weekly_report(today, &self.input())
  }

  pub fn streak_report(&self, today: NaiveDate) -> StreakReport {
    stats::build_streak_report(today, &self.input(), self.options)
  }

  pub fn monthly_report(&self, today: NaiveDate) -> MonthlyReport {
    stats::build_monthly_report(today, &self.input())
  }

  pub fn rate_series(&self, today: NaiveDate, period: SeriesPeriod) -> RateSeries {
    stats::build_rate_series(today, period, &self.input())
  }
}
