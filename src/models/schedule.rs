//! Schedule (solution) model.
//!
//! A schedule is the ordered collection of assignments produced by one
//! generation run. Assignments appear in commit order. A per-entity index
//! keeps conflict checks proportional to the bookings of the entity in
//! question rather than to the whole schedule.
//!
//! # Invariant
//! For every pair of assignments sharing an entity, their slots do not
//! overlap. [`Schedule::validate`] re-checks this independently of the
//! scheduler's own bookkeeping.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::{TimeSlot, WeeklyAvailability};
use crate::error::ScheduleError;
use crate::registry::EntityRegistry;

/// A committed (activity → slot, entities) binding.
///
/// The activity ID doubles as the assignment ID: a schedule places each
/// activity at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned activity ID.
    pub activity_id: String,
    /// Assigned slot.
    pub slot: TimeSlot,
    /// Occupied entity IDs, in requirement order.
    pub entity_ids: Vec<String>,
    /// Soft score of the placement when it was chosen.
    #[serde(default)]
    pub score: f64,
}

impl Assignment {
    /// Creates a new assignment.
    pub fn new(activity_id: impl Into<String>, slot: TimeSlot, entity_ids: Vec<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            slot,
            entity_ids,
            score: 0.0,
        }
    }

    /// Sets the soft score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    /// Whether the assignment occupies `entity_id`.
    pub fn uses(&self, entity_id: &str) -> bool {
        self.entity_ids.iter().any(|e| e == entity_id)
    }

    /// Same placement (slot and entity set), ignoring score.
    pub fn same_placement(&self, other: &Self) -> bool {
        let mut mine: Vec<&String> = self.entity_ids.iter().collect();
        let mut theirs: Vec<&String> = other.entity_ids.iter().collect();
        mine.sort();
        theirs.sort();
        self.slot == other.slot && mine == theirs
    }
}

#[derive(Serialize, Deserialize)]
struct ScheduleData {
    assignments: Vec<Assignment>,
}

/// A complete or in-progress schedule.
///
/// Only the crate commits and undoes assignments, so a schedule handed out
/// by the scheduler is final.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScheduleData", into = "ScheduleData")]
pub struct Schedule {
    assignments: Vec<Assignment>,
    /// entity ID → positions in `assignments`, ascending.
    by_entity: HashMap<String, Vec<usize>>,
}

impl From<ScheduleData> for Schedule {
    fn from(data: ScheduleData) -> Self {
        Self::from_assignments(data.assignments)
    }
}

impl From<Schedule> for ScheduleData {
    fn from(schedule: Schedule) -> Self {
        Self {
            assignments: schedule.assignments,
        }
    }
}

/// An assignment present in both schedules with a different placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentChange {
    /// Placement in the original schedule.
    pub before: Assignment,
    /// Placement in the other schedule.
    pub after: Assignment,
}

/// Difference between two schedules, keyed by activity ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDiff {
    /// In the other schedule only (other's commit order).
    pub added: Vec<Assignment>,
    /// In the original schedule only (original commit order).
    pub removed: Vec<Assignment>,
    /// In both, placed differently (original commit order).
    pub changed: Vec<AssignmentChange>,
}

impl ScheduleDiff {
    /// Whether the schedules place every activity identically.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a schedule from assignments in commit order.
    ///
    /// No checks are made; call [`validate`](Self::validate) on schedules
    /// from untrusted sources.
    pub fn from_assignments(assignments: Vec<Assignment>) -> Self {
        let mut schedule = Self::new();
        for a in assignments {
            schedule.commit(a);
        }
        schedule
    }

    pub(crate) fn commit(&mut self, assignment: Assignment) {
        let pos = self.assignments.len();
        for entity_id in &assignment.entity_ids {
            self.by_entity.entry(entity_id.clone()).or_default().push(pos);
        }
        self.assignments.push(assignment);
    }

    /// Removes the most recent commit.
    pub(crate) fn undo(&mut self) -> Option<Assignment> {
        let assignment = self.assignments.pop()?;
        for entity_id in &assignment.entity_ids {
            if let Some(positions) = self.by_entity.get_mut(entity_id) {
                positions.pop();
                if positions.is_empty() {
                    self.by_entity.remove(entity_id);
                }
            }
        }
        Some(assignment)
    }

    /// Assignments in commit order.
    ///
    /// Each call starts a fresh pass; the iterator is also `Clone`.
    pub fn assignments(&self) -> std::slice::Iter<'_, Assignment> {
        self.assignments.iter()
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether the schedule has no assignments.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Finds the assignment for a given activity.
    pub fn assignment_for_activity(&self, activity_id: &str) -> Option<&Assignment> {
        self.assignments
            .iter()
            .find(|a| a.activity_id == activity_id)
    }

    /// Assignments occupying `entity_id`, in commit order.
    pub fn assignments_for_entity<'a>(
        &'a self,
        entity_id: &str,
    ) -> impl Iterator<Item = &'a Assignment> + 'a {
        self.by_entity
            .get(entity_id)
            .into_iter()
            .flatten()
            .map(move |&pos| &self.assignments[pos])
    }

    /// Entity IDs with at least one assignment, sorted.
    pub fn booked_entities(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.by_entity.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Makespan: latest end time across all assignments (ms).
    pub fn makespan_ms(&self) -> i64 {
        self.assignments
            .iter()
            .map(|a| a.slot.end_ms)
            .max()
            .unwrap_or(0)
    }

    /// Sum of the soft scores of all assignments.
    pub fn total_score(&self) -> f64 {
        self.assignments.iter().map(|a| a.score).sum()
    }

    /// Re-checks the core invariant: no two assignments sharing an entity
    /// overlap in time.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        for entity_id in self.booked_entities() {
            let mut booked: Vec<&Assignment> = self.assignments_for_entity(entity_id).collect();
            booked.sort_by_key(|a| (a.slot.start_ms, a.slot.end_ms));
            for pair in booked.windows(2) {
                if pair[0].slot.overlaps(&pair[1].slot) {
                    return Err(ScheduleError::InvariantViolation {
                        entity_id: entity_id.to_string(),
                        message: format!(
                            "'{}' {} overlaps '{}' {}",
                            pair[0].activity_id, pair[0].slot, pair[1].activity_id, pair[1].slot
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// [`validate`](Self::validate) plus: every assignment lies within the
    /// availability of every entity it uses.
    pub fn validate_against(&self, registry: &EntityRegistry) -> Result<(), ScheduleError> {
        self.validate()?;
        for a in &self.assignments {
            for entity_id in &a.entity_ids {
                let covered = registry
                    .get(entity_id)
                    .is_some_and(|e| e.is_available_for(&a.slot));
                if !covered {
                    return Err(ScheduleError::InvariantViolation {
                        entity_id: entity_id.clone(),
                        message: format!(
                            "'{}' {} lies outside availability",
                            a.activity_id, a.slot
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Added, removed, and changed assignments going from `self` to `other`.
    pub fn diff(&self, other: &Schedule) -> ScheduleDiff {
        let mine: BTreeMap<&str, &Assignment> = self
            .assignments
            .iter()
            .map(|a| (a.activity_id.as_str(), a))
            .collect();
        let theirs: BTreeMap<&str, &Assignment> = other
            .assignments
            .iter()
            .map(|a| (a.activity_id.as_str(), a))
            .collect();

        let mut diff = ScheduleDiff::default();
        for a in &self.assignments {
            match theirs.get(a.activity_id.as_str()) {
                None => diff.removed.push(a.clone()),
                Some(b) if !a.same_placement(b) => diff.changed.push(AssignmentChange {
                    before: a.clone(),
                    after: (*b).clone(),
                }),
                Some(_) => {}
            }
        }
        diff.added = other
            .assignments
            .iter()
            .filter(|b| !mine.contains_key(b.activity_id.as_str()))
            .cloned()
            .collect();
        diff
    }

    /// An entity's bookings rendered as a weekly template.
    pub fn weekly_view(&self, entity_id: &str) -> WeeklyAvailability {
        WeeklyAvailability::from_slots(self.assignments_for_entity(entity_id).map(|a| &a.slot))
    }
}
