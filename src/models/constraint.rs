//! Scheduling constraints.
//!
//! Hard rules decide whether a candidate placement is acceptable at all;
//! soft rules score acceptable placements (higher is better). The two are
//! evaluated independently: a candidate is acceptable only if every hard
//! rule holds, whatever its soft score.
//!
//! Constraints refer to activities and entities by ID only.

use serde::{Deserialize, Serialize};

use super::{Activity, Entity, EntityKind, Schedule, TimeSlot};
use crate::conflict::ConflictDetector;

/// A proposed (activity, slot, entities) placement.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    /// Activity being placed.
    pub activity: &'a Activity,
    /// Proposed slot.
    pub slot: TimeSlot,
    /// Entities the activity would occupy, grouped by requirement.
    pub entities: Vec<&'a Entity>,
}

impl<'a> Candidate<'a> {
    /// Creates a candidate.
    pub fn new(activity: &'a Activity, slot: TimeSlot, entities: Vec<&'a Entity>) -> Self {
        Self {
            activity,
            slot,
            entities,
        }
    }

    /// IDs of the occupied entities.
    pub fn entity_ids(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.id.clone()).collect()
    }

    /// Whether the candidate uses `entity_id`.
    pub fn uses(&self, entity_id: &str) -> bool {
        self.entities.iter().any(|e| e.id == entity_id)
    }
}

/// What a preference rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceTarget {
    /// Each occupied entity listed in the activity's `preferred_entities`.
    PreferredEntities,
    /// Using this specific entity.
    Entity(String),
    /// Lying entirely inside this window.
    Window(TimeSlot),
}

/// The rule a constraint enforces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintRule {
    /// Every occupied entity is available for the whole slot, and the slot
    /// lies inside the activity's fixed window.
    HardAvailability,

    /// No occupied entity is already booked during the slot.
    NoDoubleBooking,

    /// Occupied entities (optionally only those of `kind`) accommodate the
    /// activity's demand.
    CapacityLimit {
        #[serde(default)]
        kind: Option<EntityKind>,
    },

    /// Soft: adds `weight` per match. Applies to every activity when
    /// `activity_id` is `None`.
    PreferenceScore {
        #[serde(default)]
        activity_id: Option<String>,
        target: PreferenceTarget,
        weight: f64,
    },
}

/// A named constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Constraint identifier, reported when the constraint rejects a candidate.
    pub id: String,
    /// The rule.
    pub rule: ConstraintRule,
}

/// Outcome of evaluating one constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// Hard rule holds.
    Satisfied,
    /// Hard rule broken.
    Violated,
    /// Soft rule contribution.
    Score(f64),
}

impl Constraint {
    /// Creates a constraint.
    pub fn new(id: impl Into<String>, rule: ConstraintRule) -> Self {
        Self {
            id: id.into(),
            rule,
        }
    }

    /// Availability + fixed window rule.
    pub fn hard_availability() -> Self {
        Self::new("hard-availability", ConstraintRule::HardAvailability)
    }

    /// No-double-booking rule.
    pub fn no_double_booking() -> Self {
        Self::new("no-double-booking", ConstraintRule::NoDoubleBooking)
    }

    /// Capacity rule over all entities, or only those of `kind`.
    pub fn capacity_limit(kind: Option<EntityKind>) -> Self {
        Self::new("capacity-limit", ConstraintRule::CapacityLimit { kind })
    }

    /// Soft preference.
    pub fn preference(
        id: impl Into<String>,
        activity_id: Option<String>,
        target: PreferenceTarget,
        weight: f64,
    ) -> Self {
        Self::new(
            id,
            ConstraintRule::PreferenceScore {
                activity_id,
                target,
                weight,
            },
        )
    }

    /// Whether this is a hard rule.
    pub fn is_hard(&self) -> bool {
        !matches!(self.rule, ConstraintRule::PreferenceScore { .. })
    }

    /// Evaluates the constraint against a candidate and the in-progress schedule.
    pub fn evaluate(&self, candidate: &Candidate<'_>, schedule: &Schedule) -> Evaluation {
        let holds = |ok: bool| {
            if ok {
                Evaluation::Satisfied
            } else {
                Evaluation::Violated
            }
        };

        match &self.rule {
            ConstraintRule::HardAvailability => {
                holds(ConflictDetector::check_availability(candidate).is_ok())
            }
            ConstraintRule::NoDoubleBooking => {
                holds(ConflictDetector::check_bookings(candidate, schedule).is_ok())
            }
            ConstraintRule::CapacityLimit { kind } => holds(
                candidate
                    .entities
                    .iter()
                    .filter(|e| kind.as_ref().map_or(true, |k| &e.kind == k))
                    .all(|e| e.capacity >= candidate.activity.demand),
            ),
            ConstraintRule::PreferenceScore {
                activity_id,
                target,
                weight,
            } => {
                if activity_id
                    .as_deref()
                    .is_some_and(|id| id != candidate.activity.id)
                {
                    return Evaluation::Score(0.0);
                }
                let matches = match target {
                    PreferenceTarget::PreferredEntities => candidate
                        .entities
                        .iter()
                        .filter(|e| candidate.activity.prefers(&e.id))
                        .count(),
                    PreferenceTarget::Entity(id) => usize::from(candidate.uses(id)),
                    PreferenceTarget::Window(window) => usize::from(window.covers(&candidate.slot)),
                };
                Evaluation::Score(weight * matches as f64)
            }
        }
    }
}

/// Result of hard-constraint evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardVerdict {
    /// All hard constraints hold.
    Satisfied,
    /// The first hard constraint (in insertion order) that failed.
    ViolatedBy(String),
}

impl HardVerdict {
    /// Whether all hard constraints hold.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

/// Ordered collection of constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The hard rules every generation run should carry:
    /// availability, no double booking, capacity.
    pub fn standard() -> Self {
        Self::new()
            .with(Constraint::hard_availability())
            .with(Constraint::no_double_booking())
            .with(Constraint::capacity_limit(None))
    }

    /// Appends a constraint.
    pub fn add(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Builder: appends a constraint and returns self.
    pub fn with(mut self, constraint: Constraint) -> Self {
        self.add(constraint);
        self
    }

    /// All constraints in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    /// Number of constraints.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Checks every hard constraint. Reports the first one that fails.
    pub fn evaluate_hard(&self, candidate: &Candidate<'_>, schedule: &Schedule) -> HardVerdict {
        for constraint in self.constraints.iter().filter(|c| c.is_hard()) {
            if constraint.evaluate(candidate, schedule) == Evaluation::Violated {
                return HardVerdict::ViolatedBy(constraint.id.clone());
            }
        }
        HardVerdict::Satisfied
    }

    /// Sum of all soft scores, accumulated in insertion order.
    pub fn evaluate_soft(&self, candidate: &Candidate<'_>, schedule: &Schedule) -> f64 {
        self.constraints
            .iter()
            .filter(|c| !c.is_hard())
            .filter_map(|c| match c.evaluate(candidate, schedule) {
                Evaluation::Score(s) => Some(s),
                _ => None,
            })
            .sum()
    }
}

impl FromIterator<Constraint> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        Self {
            constraints: iter.into_iter().collect(),
        }
    }
}
