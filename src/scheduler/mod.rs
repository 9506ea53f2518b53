//! Assignment engine and KPI evaluation.
//!
//! [`Scheduler`] places activities onto entities and time slots with a
//! backtracking search, ordering activities by fewest candidates first and
//! choosing among feasible placements by soft score.
//!
//! # Configuration
//!
//! Granularity, search budget, tie-breaking and activity order come from a
//! [`SchedulerConfig`] handed to each run. Cancellation is cooperative via a
//! [`CancellationToken`], checked between placements.
//!
//! # KPI
//!
//! `ScheduleKpi` summarises a finalized schedule: size, makespan, soft score,
//! and per-entity utilization.
//!
//! # References
//!
//! - Russell & Norvig (2020), "Artificial Intelligence: A Modern Approach", Ch. 6
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 1.2

mod cancel;
mod config;
mod kpi;
mod search;

pub use cancel::CancellationToken;
pub use config::{ActivityOrder, SchedulerConfig, TieBreakPolicy};
pub use kpi::ScheduleKpi;
pub use search::{Scheduler, SearchState, SearchStats};
