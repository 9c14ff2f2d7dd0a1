pub mod result;
pub mod routine;
pub mod schedule;

pub use result::{GameOutcome, ResultRecord};
pub use routine::{
  NewRoutine, RoutineDefinition, RoutineId, RoutineKind, RoutinePatch, ValidationError, WeekdaySet,
};
pub use schedule::{DaySchedule, ScheduleBook};
