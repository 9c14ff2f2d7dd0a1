//! Consecutive-day streaks
//!
//! A day counts toward a streak when something was due and every due routine
//! was completed. The scan walks backward from today:
//! - today never ends the scan (the day is still in progress)
//! - the first earlier day that is not fully completed ends the current streak
//! - longest/total keep counting across the whole horizon

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{day_stat, AnalyticsInput, DayStat};
use crate::calendar;

pub const DEFAULT_HORIZON_DAYS: u32 = 365;

// ---------------------------------------------------------------------------
/// Zero-due day policy
// ---------------------------------------------------------------------------

/// How a past day with nothing due affects a streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroDuePolicy {
    /// Not fully completed, so it ends the run
    #[default]
    BreaksStreak,
    /// Transparent: neither extends nor ends the run
    Skip,
}

impl std::str::FromStr for ZeroDuePolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "break" | "breaks_streak" => Ok(Self::BreaksStreak),
            "skip" => Ok(Self::Skip),
            _ => Err(format!("Unknown zero-due policy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakOptions {
    pub horizon_days: u32,
    pub zero_due: ZeroDuePolicy,
}

impl Default for StreakOptions {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            zero_due: ZeroDuePolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
/// Streak State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakState {
    pub current: u32,
    pub longest: u32,
    pub total_fully_completed_days: u32,
}

/// Scan backward from `today` for up to `options.horizon_days` days.
///
/// Never looks into the future, and stops early if the calendar runs out.
pub fn compute_streak(
    today: NaiveDate,
    input: &AnalyticsInput,
    options: StreakOptions,
) -> StreakState {
    let mut state = StreakState::default();
    let mut run = 0u32;
    let mut current_open = true;

    for (offset, date) in calendar::days_back(today, options.horizon_days).enumerate() {
        let stat = day_stat(date, input);
        let is_today = offset == 0;

        if stat.is_fully_completed() {
            run += 1;
            state.longest = state.longest.max(run);
            state.total_fully_completed_days += 1;
            if current_open {
                state.current += 1;
            }
            continue;
        }

        if stat.due == 0 && options.zero_due == ZeroDuePolicy::Skip {
            continue;
        }

        run = 0;
        if !is_today {
            current_open = false;
        }
    }

    state
}

// ---------------------------------------------------------------------------
/// Recent day strip
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStatus {
    pub date: NaiveDate,
    pub stat: DayStat,
    pub fully_completed: bool,
}

/// Per-day status for the last `days` days, oldest first
pub fn recent_days(today: NaiveDate, days: u32, input: &AnalyticsInput) -> Vec<DayStatus> {
    let mut strip: Vec<DayStatus> = calendar::days_back(today, days)
        .map(|date| {
            let stat = day_stat(date, input);
            DayStatus {
                date,
                stat,
                fully_completed: stat.is_fully_completed(),
            }
        })
        .collect();
    strip.reverse();
    strip
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionHistory;
    use crate::models::{RoutineDefinition, RoutineId, ScheduleBook};
    use crate::test_utils::{date, every_day_routine, mock_daily_routine};
    use chrono::{Duration, Weekday};

    fn complete_days(history: &mut CompletionHistory, id: &str, days: &[NaiveDate]) {
        for d in days {
            history.set_completed(*d, &RoutineId::from(id), true);
        }
    }

    fn streak(
        today: NaiveDate,
        routines: &[RoutineDefinition],
        history: &CompletionHistory,
        options: StreakOptions,
    ) -> StreakState {
        let schedule = ScheduleBook::new();
        compute_streak(today, &AnalyticsInput::new(routines, &schedule, history), options)
    }

    #[test]
    fn test_today_in_progress_then_completed() {
        let routines = vec![every_day_routine("r1")];
        let today = date("2024-03-10");
        let mut history = CompletionHistory::new();
        let previous: Vec<_> = (1..=5).map(|i| today - Duration::days(i)).collect();
        complete_days(&mut history, "r1", &previous);

        // Today is due but not done yet; it neither counts nor ends the scan
        let before = streak(today, &routines, &history, StreakOptions::default());
        assert_eq!(before.current, 5);
        assert_eq!(before.longest, 5);

        history.toggle(today, &RoutineId::from("r1"));
        let after = streak(today, &routines, &history, StreakOptions::default());
        assert_eq!(after.current, 6);
        assert_eq!(after.longest, 6);
        assert_eq!(after.total_fully_completed_days, 6);
    }

    #[test]
    fn test_streak_stops_at_first_gap_before_today() {
        let routines = vec![every_day_routine("r1")];
        let today = date("2024-03-10");
        let mut history = CompletionHistory::new();
        for n in 0..4 {
            // [today-3, today] completed, today-4 missed
            complete_days(&mut history, "r1", &[today - Duration::days(n)]);
        }
        // An older, longer run beyond the gap
        let older: Vec<_> = (5..=12).map(|i| today - Duration::days(i)).collect();
        complete_days(&mut history, "r1", &older);

        let state = streak(today, &routines, &history, StreakOptions::default());
        assert_eq!(state.current, 4);
        assert_eq!(state.longest, 8);
        assert_eq!(state.total_fully_completed_days, 12);
        assert!(state.longest >= state.current);
    }

    #[test]
    fn test_zero_due_day_breaks_by_default() {
        // Due Mon-Sat only; 2024-03-10 is a Sunday
        let routines = vec![mock_daily_routine(
            "r1",
            &[Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri, Weekday::Sat],
        )];
        let today = date("2024-03-12"); // Tuesday
        let mut history = CompletionHistory::new();
        let done: Vec<_> = [
            "2024-03-12", "2024-03-11", "2024-03-09", "2024-03-08",
        ]
        .iter()
        .map(|s| date(s))
        .collect();
        complete_days(&mut history, "r1", &done);

        let breaking = streak(today, &routines, &history, StreakOptions::default());
        assert_eq!(breaking.current, 2);

        let skipping = streak(
            today,
            &routines,
            &history,
            StreakOptions {
                zero_due: ZeroDuePolicy::Skip,
                ..StreakOptions::default()
            },
        );
        assert_eq!(skipping.current, 4);
        assert_eq!(skipping.longest, 4);
    }

    #[test]
    fn test_zero_due_today_does_not_end_scan() {
        let routines = vec![mock_daily_routine("r1", &[Weekday::Sat])];
        let today = date("2024-03-10"); // Sunday, nothing due
        let mut history = CompletionHistory::new();
        complete_days(&mut history, "r1", &[date("2024-03-09")]);

        let state = streak(today, &routines, &history, StreakOptions::default());
        assert_eq!(state.current, 1);
    }

    #[test]
    fn test_horizon_bounds_the_scan() {
        let routines = vec![every_day_routine("r1")];
        let today = date("2024-03-10");
        let mut history = CompletionHistory::new();
        let all: Vec<_> = (0..30).map(|i| today - Duration::days(i)).collect();
        complete_days(&mut history, "r1", &all);

        let state = streak(
            today,
            &routines,
            &history,
            StreakOptions {
                horizon_days: 10,
                ..StreakOptions::default()
            },
        );
        assert_eq!(state.current, 10);
        assert_eq!(state.total_fully_completed_days, 10);
    }

    #[test]
    fn test_future_completions_are_ignored() {
        let routines = vec![every_day_routine("r1")];
        let today = date("2024-03-10");
        let mut history = CompletionHistory::new();
        complete_days(&mut history, "r1", &[date("2024-03-11"), date("2024-03-12")]);

        assert_eq!(
            streak(today, &routines, &history, StreakOptions::default()),
            StreakState::default()
        );
    }

    #[test]
    fn test_no_routines_means_no_streak() {
        let history = CompletionHistory::new();
        let state = streak(date("2024-03-10"), &[], &history, StreakOptions::default());
        assert_eq!(state, StreakState::default());
    }

    #[test]
    fn test_scan_stops_at_calendar_minimum() {
        let routines = vec![every_day_routine("r1")];
        let mut history = CompletionHistory::new();
        complete_days(&mut history, "r1", &[NaiveDate::MIN]);

        let state = streak(NaiveDate::MIN, &routines, &history, StreakOptions::default());
        assert_eq!(state.current, 1);
    }

    #[test]
    fn test_recent_days_strip() {
        let routines = vec![every_day_routine("r1")];
        let schedule = ScheduleBook::new();
        let today = date("2024-03-10");
        let mut history = CompletionHistory::new();
        complete_days(&mut history, "r1", &[date("2024-03-09")]);
        let input = AnalyticsInput::new(&routines, &schedule, &history);

        let strip = recent_days(today, 3, &input);
        assert_eq!(strip.len(), 3);
        assert_eq!(strip[0].date, date("2024-03-08"));
        assert!(!strip[0].fully_completed);
        assert!(strip[1].fully_completed);
        assert_eq!(strip[2].stat, DayStat::new(1, 0));
    }
}
