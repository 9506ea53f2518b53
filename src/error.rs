//! Error taxonomy for schedule generation.
//!
//! Three outcomes are kept strictly apart:
//! - [`ScheduleError::InvalidRequest`]: the input is malformed or
//!   referentially inconsistent. Not retried.
//! - [`ScheduleError::Infeasible`]: the input is fine but no schedule
//!   satisfies the hard constraints (or the search budget ran out).
//! - [`ScheduleError::InvariantViolation`]: post-run validation caught the
//!   engine producing a double booking or an out-of-availability placement.
//!   Always an internal bug.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural or referential problem with a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// An entity with this ID is already registered.
    #[error("duplicate entity: {0}")]
    DuplicateEntity(String),

    /// No entity with this ID exists in the registry.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// Two activities share the same ID.
    #[error("duplicate activity: {0}")]
    DuplicateActivity(String),

    /// An activity requires a kind no registered entity has.
    #[error("activity '{activity_id}' requires kind '{kind}' which is absent from the registry")]
    UnknownKind { activity_id: String, kind: String },

    /// Fewer eligible entities exist than an activity requires.
    #[error("activity '{activity_id}' needs {required} x '{kind}' but only {available} are eligible")]
    InsufficientEntities {
        activity_id: String,
        kind: String,
        required: u32,
        available: usize,
    },

    /// An activity has no entity requirements, so it cannot be placed anywhere.
    #[error("activity '{0}' has no entity requirements")]
    EmptyRequirements(String),

    /// Activity duration must be positive.
    #[error("activity '{activity_id}' has non-positive duration {duration_ms}ms")]
    InvalidDuration { activity_id: String, duration_ms: i64 },

    /// Entity capacity must be at least 1.
    #[error("entity '{entity_id}' has invalid capacity {capacity}")]
    InvalidCapacity { entity_id: String, capacity: u32 },

    /// A slot whose end is not after its start.
    #[error("invalid time slot [{start_ms}, {end_ms})")]
    InvalidSlot { start_ms: i64, end_ms: i64 },

    /// Two availability intervals of the same entity overlap.
    #[error("overlapping availability [{first_start_ms}, {first_end_ms}) and [{second_start_ms}, {second_end_ms})")]
    OverlappingAvailability {
        first_start_ms: i64,
        first_end_ms: i64,
        second_start_ms: i64,
        second_end_ms: i64,
    },

    /// A weekly clock time that is not `HH:MM` within a day.
    #[error("invalid clock time '{0}'")]
    InvalidClockTime(String),

    /// Scheduler configuration out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The request body could not be parsed.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// A scheduler instance was asked to run a second time.
    #[error("scheduler has already run")]
    AlreadyRun,
}

/// Why a run produced no schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InfeasibleReason {
    /// Every placement for this activity was ruled out, with nothing left to undo.
    #[error("no feasible placement for activity '{activity_id}'")]
    NoCandidates { activity_id: String },
    /// The search-step budget (or the per-activity candidate limit) was
    /// consumed before a complete schedule was found.
    #[error("search exhausted after {steps} steps")]
    BudgetExhausted { steps: u64 },
}

/// Errors returned by the generation core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    /// The request is malformed or inconsistent.
    #[error("invalid request: {}", join_issues(.0))]
    InvalidRequest(Vec<RequestError>),

    /// No schedule satisfies the hard constraints.
    #[error("infeasible: {0}")]
    Infeasible(InfeasibleReason),

    /// Two assignments sharing an entity overlap, or an assignment lies
    /// outside its entity's availability.
    #[error("invariant violation on entity '{entity_id}': {message}")]
    InvariantViolation { entity_id: String, message: String },

    /// The caller may not generate schedules for this scope.
    #[error("not authorized to generate for scope '{scope}'")]
    Unauthorized { scope: String },

    /// The run was cancelled between placements.
    #[error("run cancelled")]
    Cancelled,
}

impl ScheduleError {
    /// Whether the error is an infeasibility verdict (as opposed to bad input
    /// or an engine fault).
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::Infeasible(_))
    }

    /// Whether the error signals a bug in the engine itself.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

impl From<RequestError> for ScheduleError {
    fn from(err: RequestError) -> Self {
        Self::InvalidRequest(vec![err])
    }
}

impl From<Vec<RequestError>> for ScheduleError {
    fn from(errs: Vec<RequestError>) -> Self {
        Self::InvalidRequest(errs)
    }
}

fn join_issues(issues: &[RequestError]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
