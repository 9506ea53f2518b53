//! Scheduling domain models.
//!
//! Provides the data types for describing a generation problem and its
//! solution.
//!
//! # Domain Mappings
//!
//! | u-slot | Tutoring | Clinic | Workshop |
//! |--------|----------|--------|----------|
//! | Entity (person) | Tutor/Student | Doctor | Instructor |
//! | Entity (room) | Classroom | Exam Room | Bay |
//! | Activity | Lesson | Appointment | Session |
//! | Schedule | Weekly Timetable | Day Roster | Course Plan |

mod activity;
mod constraint;
mod entity;
mod schedule;
mod time;
mod weekly;

pub use activity::{Activity, EntityRequirement};
pub use constraint::{
    Candidate, Constraint, ConstraintRule, ConstraintSet, Evaluation, HardVerdict,
    PreferenceTarget,
};
pub use entity::{Entity, EntityKind};
pub use schedule::{Assignment, AssignmentChange, Schedule, ScheduleDiff};
pub use time::{Availability, TimeSlot, DAY_MS, HOUR_MS, MINUTE_MS};
pub use weekly::{ClockSlot, Weekday, WeeklyAvailability, WEEK_MS};

pub(crate) use time::align_up;
