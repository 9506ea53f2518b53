//! Entity model.
//!
//! Entities are the participants and resources an activity occupies:
//! people, rooms, equipment. Each has a kind, a capacity, and an
//! availability set.

use serde::{Deserialize, Serialize};

use super::{Availability, TimeSlot, WeeklyAvailability};
use crate::error::RequestError;

/// Entity kind classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A person (tutor, student, operator).
    Person,
    /// A room or location.
    Room,
    /// A piece of equipment.
    Equipment,
    /// Domain-specific kind.
    Custom(String),
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Person => f.write_str("person"),
            Self::Room => f.write_str("room"),
            Self::Equipment => f.write_str("equipment"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

fn default_capacity() -> u32 {
    1
}

/// A schedulable participant or resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique entity identifier.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Entity classification.
    pub kind: EntityKind,
    /// When the entity can be booked.
    #[serde(default)]
    pub availability: Availability,
    /// How many heads the entity accommodates (default: 1).
    #[serde(default = "default_capacity")]
    pub capacity: u32,
}

impl Entity {
    /// Creates a new entity with no availability and capacity 1.
    pub fn new(id: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind,
            availability: Availability::never(),
            capacity: 1,
        }
    }

    /// Creates a person.
    pub fn person(id: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Person)
    }

    /// Creates a room.
    pub fn room(id: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Room)
    }

    /// Creates a piece of equipment.
    pub fn equipment(id: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Equipment)
    }

    /// Sets the entity name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the capacity.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the availability set.
    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    /// Builds availability from a list of slots.
    pub fn available(mut self, slots: Vec<TimeSlot>) -> Result<Self, RequestError> {
        self.availability = Availability::new(slots)?;
        Ok(self)
    }

    /// Builds availability from a weekly template for the given week.
    pub fn available_weekly(
        mut self,
        weekly: &WeeklyAvailability,
        week: i64,
    ) -> Result<Self, RequestError> {
        self.availability = weekly.to_availability(week)?;
        Ok(self)
    }

    /// Whether the entity is free for the whole slot (ignoring bookings).
    pub fn is_available_for(&self, slot: &TimeSlot) -> bool {
        self.availability.covers(slot)
    }

    pub(crate) fn check(&self) -> Result<(), RequestError> {
        if self.capacity == 0 {
            return Err(RequestError::InvalidCapacity {
                entity_id: self.id.clone(),
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_builder() {
        let e = Entity::room("R1")
            .with_name("Room 101")
            .with_capacity(30)
            .available(vec![TimeSlot::new(0, 1_000)])
            .unwrap();

        assert_eq!(e.id, "R1");
        assert_eq!(e.name, "Room 101");
        assert_eq!(e.kind, EntityKind::Room);
        assert_eq!(e.capacity, 30);
        assert!(e.is_available_for(&TimeSlot::new(100, 900)));
        assert!(!e.is_available_for(&TimeSlot::new(900, 1_100)));
    }

    #[test]
    fn test_entity_kinds() {
        assert_eq!(Entity::person("P1").kind, EntityKind::Person);
        assert_eq!(Entity::equipment("E1").kind, EntityKind::Equipment);
        assert_eq!(EntityKind::Custom("lab".into()).to_string(), "lab");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let e = Entity::room("R1").with_capacity(0);
        assert_eq!(
            e.check(),
            Err(RequestError::InvalidCapacity {
                entity_id: "R1".into(),
                capacity: 0
            })
        );
    }

    #[test]
    fn test_entity_json_defaults() {
        let json = r#"{"id":"T1","kind":"person","availability":[{"start_ms":0,"end_ms":60}]}"#;
        let e: Entity = serde_json::from_str(json).unwrap();
        assert_eq!(e.capacity, 1);
        assert_eq!(e.name, "");
        assert_eq!(e.availability.total_ms(), 60);

        let custom: EntityKind = serde_json::from_str(r#"{"custom":"lab"}"#).unwrap();
        assert_eq!(custom, EntityKind::Custom("lab".into()));
    }
}
