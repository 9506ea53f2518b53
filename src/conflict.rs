//! Conflict detection.
//!
//! Decides whether a candidate placement violates `HardAvailability` or
//! `NoDoubleBooking` against an in-progress schedule. For each entity the
//! candidate uses, the check scans only the assignments already booked on
//! that entity (O(k) for k bookings), via the schedule's per-entity index.
//!
//! Detection is pure: no state is touched, and for identical inputs the
//! same verdict (including the same conflicting entity and assignment) is
//! returned. Entities are examined in candidate order and bookings in
//! commit order, so the first conflict reported is deterministic.

use thiserror::Error;

use crate::models::{Candidate, Schedule};

/// Why a candidate cannot be placed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    /// The entity is already booked by an overlapping assignment.
    #[error("'{entity_id}' already booked by '{assignment_id}'")]
    DoubleBooked {
        entity_id: String,
        assignment_id: String,
    },
    /// The slot is not inside the entity's availability.
    #[error("'{entity_id}' is unavailable")]
    Unavailable { entity_id: String },
    /// The slot falls outside the activity's fixed window.
    #[error("outside the window of '{activity_id}'")]
    OutsideWindow { activity_id: String },
    /// The candidate lists the same entity twice.
    #[error("'{entity_id}' listed twice")]
    RepeatedEntity { entity_id: String },
}

/// Stateless conflict checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector;

impl ConflictDetector {
    /// Full check: availability first, then bookings.
    pub fn detect(candidate: &Candidate<'_>, schedule: &Schedule) -> Result<(), Conflict> {
        Self::check_availability(candidate)?;
        Self::check_bookings(candidate, schedule)
    }

    /// Fixed window and per-entity availability.
    pub fn check_availability(candidate: &Candidate<'_>) -> Result<(), Conflict> {
        if let Some(window) = &candidate.activity.window {
            if !window.covers(&candidate.slot) {
                return Err(Conflict::OutsideWindow {
                    activity_id: candidate.activity.id.clone(),
                });
            }
        }
        for entity in &candidate.entities {
            if !entity.is_available_for(&candidate.slot) {
                return Err(Conflict::Unavailable {
                    entity_id: entity.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Overlap against existing bookings of each entity.
    pub fn check_bookings(candidate: &Candidate<'_>, schedule: &Schedule) -> Result<(), Conflict> {
        for (i, entity) in candidate.entities.iter().enumerate() {
            if candidate.entities[..i].iter().any(|e| e.id == entity.id) {
                return Err(Conflict::RepeatedEntity {
                    entity_id: entity.id.clone(),
                });
            }
            if let Some(existing) = schedule
                .assignments_for_entity(&entity.id)
                .find(|a| a.slot.overlaps(&candidate.slot))
            {
                return Err(Conflict::DoubleBooked {
                    entity_id: entity.id.clone(),
                    assignment_id: existing.activity_id.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Activity, Assignment, Entity, EntityKind, TimeSlot, HOUR_MS};

    fn slot(start_h: i64, end_h: i64) -> TimeSlot {
        TimeSlot::new(start_h * HOUR_MS, end_h * HOUR_MS)
    }

    fn entities() -> (Entity, Entity) {
        let tutor = Entity::person("T1").available(vec![slot(9, 17)]).unwrap();
        let room = Entity::room("R1").available(vec![slot(8, 12)]).unwrap();
        (tutor, room)
    }

    fn lesson() -> Activity {
        Activity::new("A2", HOUR_MS)
            .requires(EntityKind::Person, 1)
            .requires(EntityKind::Room, 1)
    }

    fn booked() -> Schedule {
        Schedule::from_assignments(vec![
            Assignment::new("A0", slot(9, 10), vec!["T9".into(), "R1".into()]),
            Assignment::new("A1", slot(10, 11), vec!["T1".into(), "R9".into()]),
        ])
    }

    #[test]
    fn test_ok_when_free() {
        let (tutor, room) = entities();
        let act = lesson();
        let c = Candidate::new(&act, slot(11, 12), vec![&tutor, &room]);
        assert_eq!(ConflictDetector::detect(&c, &booked()), Ok(()));
    }

    #[test]
    fn test_double_booking_reports_entity_and_assignment() {
        let (tutor, room) = entities();
        let act = lesson();
        let c = Candidate::new(&act, slot(10, 11), vec![&tutor, &room]);
        assert_eq!(
            ConflictDetector::detect(&c, &booked()),
            Err(Conflict::DoubleBooked {
                entity_id: "T1".into(),
                assignment_id: "A1".into(),
            })
        );
    }

    #[test]
    fn test_touching_slots_do_not_conflict() {
        let (tutor, room) = entities();
        let act = lesson();
        let schedule = Schedule::from_assignments(vec![Assignment::new(
            "A0",
            slot(9, 10),
            vec!["T1".into(), "R1".into()],
        )]);
        let c = Candidate::new(&act, slot(10, 11), vec![&tutor, &room]);
        assert!(ConflictDetector::detect(&c, &schedule).is_ok());
    }

    #[test]
    fn test_unavailable_entity() {
        let (tutor, room) = entities();
        let act = lesson();
        // Room closes at 12.
        let c = Candidate::new(&act, slot(12, 13), vec![&tutor, &room]);
        assert_eq!(
            ConflictDetector::detect(&c, &Schedule::new()),
            Err(Conflict::Unavailable {
                entity_id: "R1".into()
            })
        );
    }

    #[test]
    fn test_outside_window() {
        let (tutor, room) = entities();
        let act = lesson().within(10 * HOUR_MS, 11 * HOUR_MS);
        let c = Candidate::new(&act, slot(9, 10), vec![&tutor, &room]);
        assert_eq!(
            ConflictDetector::check_availability(&c),
            Err(Conflict::OutsideWindow {
                activity_id: "A2".into()
            })
        );
    }

    #[test]
    fn test_repeated_entity() {
        let (tutor, _) = entities();
        let act = lesson();
        let c = Candidate::new(&act, slot(9, 10), vec![&tutor, &tutor]);
        assert_eq!(
            ConflictDetector::check_bookings(&c, &Schedule::new()),
            Err(Conflict::RepeatedEntity {
                entity_id: "T1".into()
            })
        );
    }

    #[test]
    fn test_detection_is_deterministic() {
        let (tutor, room) = entities();
        let act = lesson();
        let schedule = booked();
        let c = Candidate::new(&act, slot(9, 11), vec![&tutor, &room]);
        let first = ConflictDetector::detect(&c, &schedule);
        for _ in 0..10 {
            assert_eq!(ConflictDetector::detect(&c, &schedule), first);
        }
        assert_eq!(schedule.len(), 2);
    }

    #[test]
    fn test_conflict_is_an_error() {
        let (tutor, room) = entities();
        let act = lesson();
        let c = Candidate::new(&act, slot(10, 11), vec![&tutor, &room]);
        let err: Box<dyn std::error::Error> = ConflictDetector::detect(&c, &booked())
            .unwrap_err()
            .into();
        assert_eq!(err.to_string(), "'T1' already booked by 'A1'");
    }
}
