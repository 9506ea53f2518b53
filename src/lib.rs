//! Conflict-free schedule generation.
//!
//! Given entities (people, rooms, equipment) with availability and a set of
//! activities that each need some of them for a fixed duration, produces an
//! assignment of every activity to a time slot and entities such that no
//! entity is double-booked and every placement lies inside the availability
//! of the entities it uses. Soft preferences rank the feasible placements.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `TimeSlot`, `Availability`, `Entity`,
//!   `Activity`, `Constraint`, `Schedule`, `Assignment`, weekly templates
//! - **`registry`**: Entity registry and immutable run snapshots
//! - **`conflict`**: Double-booking and availability checks for candidates
//! - **`scheduler`**: Backtracking search, configuration, cancellation, KPIs
//! - **`validation`**: Input integrity checks (duplicate IDs, unknown kinds and
//!   entities, impossible requirements)
//! - **`service`**: Typed and JSON request boundary, authorization hook,
//!   parallel independent runs
//! - **`error`**: Error taxonomy
//!
//! # Logging
//!
//! Emits `tracing` events; installing a subscriber is up to the caller.
//!
//! # References
//!
//! - Russell & Norvig (2020), "Artificial Intelligence: A Modern Approach", Ch. 6
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"

pub mod conflict;
pub mod error;
pub mod models;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod validation;

pub use error::{InfeasibleReason, RequestError, ScheduleError};
