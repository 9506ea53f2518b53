//! Input validation for generation requests.
//!
//! Checks structural and referential integrity of activities against the
//! registry before any search starts. Detects:
//! - Duplicate activity IDs
//! - Non-positive durations and inverted windows
//! - Activities that need no entities at all
//! - Requirements naming a kind the registry lacks
//! - References to unknown entities (candidates, preferences)
//! - Requirements asking for more entities than are eligible
//!
//! All problems are collected, not just the first.

use std::collections::HashSet;

use crate::error::RequestError;
use crate::models::Activity;
use crate::registry::EntityRegistry;

/// Validation result: every problem found, in activity order.
pub type ValidationResult = Result<(), Vec<RequestError>>;

/// Validates activities against a registry.
pub fn validate_request(registry: &EntityRegistry, activities: &[Activity]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for act in activities {
        if !seen.insert(act.id.as_str()) {
            errors.push(RequestError::DuplicateActivity(act.id.clone()));
        }

        if act.duration_ms <= 0 {
            errors.push(RequestError::InvalidDuration {
                activity_id: act.id.clone(),
                duration_ms: act.duration_ms,
            });
        }

        if let Some(window) = &act.window {
            if let Err(e) = window.check() {
                errors.push(e);
            }
        }

        if act.entity_count() == 0 {
            errors.push(RequestError::EmptyRequirements(act.id.clone()));
        }

        for req in act.requirements.iter().filter(|r| r.count > 0) {
            if !registry.has_kind(&req.kind) {
                errors.push(RequestError::UnknownKind {
                    activity_id: act.id.clone(),
                    kind: req.kind.to_string(),
                });
                continue;
            }

            for cand in &req.candidates {
                if registry.get(cand).is_none() {
                    errors.push(RequestError::UnknownEntity(cand.clone()));
                }
            }

            let eligible = registry
                .of_kind(&req.kind)
                .filter(|e| req.accepts(&e.id))
                .count();
            if eligible < req.count as usize {
                errors.push(RequestError::InsufficientEntities {
                    activity_id: act.id.clone(),
                    kind: req.kind.to_string(),
                    required: req.count,
                    available: eligible,
                });
            }
        }

        for pref in &act.preferred_entities {
            if registry.get(pref).is_none() {
                errors.push(RequestError::UnknownEntity(pref.clone()));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, EntityKind, EntityRequirement, HOUR_MS};

    fn sample_registry() -> EntityRegistry {
        EntityRegistry::new()
            .with(Entity::person("T1"))
            .unwrap()
            .with(Entity::person("T2"))
            .unwrap()
            .with(Entity::room("R1"))
            .unwrap()
    }

    fn lesson(id: &str) -> Activity {
        Activity::new(id, HOUR_MS)
            .requires(EntityKind::Person, 1)
            .requires(EntityKind::Room, 1)
    }

    #[test]
    fn test_valid_input() {
        let registry = sample_registry();
        assert!(validate_request(&registry, &[lesson("A1"), lesson("A2")]).is_ok());
        assert!(validate_request(&registry, &[]).is_ok());
    }

    #[test]
    fn test_duplicate_activity() {
        let registry = sample_registry();
        let errors = validate_request(&registry, &[lesson("A1"), lesson("A1")]).unwrap_err();
        assert_eq!(errors, vec![RequestError::DuplicateActivity("A1".into())]);
    }

    #[test]
    fn test_absent_kind() {
        let registry = sample_registry();
        let act = lesson("A1").requires(EntityKind::Equipment, 1);
        let errors = validate_request(&registry, &[act]).unwrap_err();
        assert_eq!(
            errors,
            vec![RequestError::UnknownKind {
                activity_id: "A1".into(),
                kind: "equipment".into(),
            }]
        );
    }

    #[test]
    fn test_insufficient_entities() {
        let registry = sample_registry();
        let act = Activity::new("A1", HOUR_MS).requires(EntityKind::Person, 3);
        let errors = validate_request(&registry, &[act]).unwrap_err();
        assert!(matches!(
            errors[0],
            RequestError::InsufficientEntities {
                required: 3,
                available: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_references() {
        let registry = sample_registry();
        let act = Activity::new("A1", HOUR_MS)
            .with_requirement(
                EntityRequirement::new(EntityKind::Person).with_candidates(vec!["T9".into()]),
            )
            .prefer("R7");
        let errors = validate_request(&registry, &[act]).unwrap_err();
        assert!(errors.contains(&RequestError::UnknownEntity("T9".into())));
        assert!(errors.contains(&RequestError::UnknownEntity("R7".into())));
    }

    #[test]
    fn test_collects_every_problem() {
        let registry = sample_registry();
        let bad_duration = Activity::new("A1", 0).requires(EntityKind::Room, 1);
        let no_needs = Activity::new("A2", HOUR_MS);
        let bad_window = lesson("A3").within(5, 5);

        let errors = validate_request(&registry, &[bad_duration, no_needs, bad_window]).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], RequestError::InvalidDuration { .. }));
        assert_eq!(errors[1], RequestError::EmptyRequirements("A2".into()));
        assert!(matches!(errors[2], RequestError::InvalidSlot { .. }));
    }
}
