//! Activity model.
//!
//! An activity is the unit of work to place: it needs a duration's worth of
//! time on a set of entities (e.g. one tutor and one room), optionally inside
//! a fixed window. Activities are immutable once handed to the scheduler.

use serde::{Deserialize, Serialize};

use super::{EntityKind, TimeSlot};

fn default_count() -> u32 {
    1
}

fn default_demand() -> u32 {
    1
}

/// An activity to be scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Unique activity identifier.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Time required (ms).
    pub duration_ms: i64,
    /// Entities needed, by kind and count.
    pub requirements: Vec<EntityRequirement>,
    /// The activity must lie entirely inside this window, if set.
    #[serde(default)]
    pub window: Option<TimeSlot>,
    /// Entities the activity would rather use (soft).
    #[serde(default)]
    pub preferred_entities: Vec<String>,
    /// Head-count checked against entity capacity (default: 1).
    #[serde(default = "default_demand")]
    pub demand: u32,
}

impl Activity {
    /// Creates a new activity.
    pub fn new(id: impl Into<String>, duration_ms: i64) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            duration_ms,
            requirements: Vec::new(),
            window: None,
            preferred_entities: Vec::new(),
            demand: 1,
        }
    }

    /// Sets the activity name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds an entity requirement.
    pub fn with_requirement(mut self, req: EntityRequirement) -> Self {
        self.requirements.push(req);
        self
    }

    /// Shorthand for requiring `count` entities of `kind`.
    pub fn requires(self, kind: EntityKind, count: u32) -> Self {
        self.with_requirement(EntityRequirement::new(kind).with_count(count))
    }

    /// Restricts placement to a fixed window.
    pub fn within(mut self, start_ms: i64, end_ms: i64) -> Self {
        self.window = Some(TimeSlot::new(start_ms, end_ms));
        self
    }

    /// Adds a preferred entity.
    pub fn prefer(mut self, entity_id: impl Into<String>) -> Self {
        self.preferred_entities.push(entity_id.into());
        self
    }

    /// Sets the head-count.
    pub fn with_demand(mut self, demand: u32) -> Self {
        self.demand = demand;
        self
    }

    /// Total number of entities the activity occupies.
    pub fn entity_count(&self) -> u32 {
        self.requirements.iter().map(|r| r.count).sum()
    }

    /// Whether `entity_id` is among the preferred entities.
    pub fn prefers(&self, entity_id: &str) -> bool {
        self.preferred_entities.iter().any(|p| p == entity_id)
    }
}

/// What an activity needs from the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRequirement {
    /// Required entity kind.
    pub kind: EntityKind,
    /// Number of distinct entities of that kind.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Specific entity IDs allowed to fulfil the requirement.
    /// Empty = any entity of the correct kind.
    #[serde(default)]
    pub candidates: Vec<String>,
}

impl EntityRequirement {
    /// Creates a requirement for one entity of `kind`.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            count: 1,
            candidates: Vec::new(),
        }
    }

    /// Sets the number of entities.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Restricts the requirement to specific entities.
    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Whether an entity ID is acceptable for this requirement.
    pub fn accepts(&self, entity_id: &str) -> bool {
        self.candidates.is_empty() || self.candidates.iter().any(|c| c == entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HOUR_MS;

    #[test]
    fn test_activity_builder() {
        let act = Activity::new("A1", HOUR_MS)
            .with_name("Algebra lesson")
            .requires(EntityKind::Person, 1)
            .requires(EntityKind::Room, 1)
            .within(9 * HOUR_MS, 17 * HOUR_MS)
            .prefer("R2")
            .with_demand(12);

        assert_eq!(act.id, "A1");
        assert_eq!(act.duration_ms, HOUR_MS);
        assert_eq!(act.requirements.len(), 2);
        assert_eq!(act.entity_count(), 2);
        assert_eq!(act.window, Some(TimeSlot::new(9 * HOUR_MS, 17 * HOUR_MS)));
        assert!(act.prefers("R2"));
        assert!(!act.prefers("R1"));
        assert_eq!(act.demand, 12);
    }

    #[test]
    fn test_requirement_candidates() {
        let any = EntityRequirement::new(EntityKind::Room);
        assert!(any.accepts("R9"));

        let pinned = EntityRequirement::new(EntityKind::Person)
            .with_count(2)
            .with_candidates(vec!["T1".into(), "T2".into()]);
        assert_eq!(pinned.count, 2);
        assert!(pinned.accepts("T2"));
        assert!(!pinned.accepts("T3"));
    }

    #[test]
    fn test_activity_json_defaults() {
        let json = r#"{"id":"A1","duration_ms":3600000,"requirements":[{"kind":"room"}]}"#;
        let act: Activity = serde_json::from_str(json).unwrap();
        assert_eq!(act.requirements[0].count, 1);
        assert_eq!(act.demand, 1);
        assert!(act.window.is_none());
        assert!(act.preferred_entities.is_empty());
    }
}
