//! Entity registry.
//!
//! Holds the entities eligible for scheduling, keyed by ID, in registration
//! order. The registry is mutable; scheduler runs read an immutable
//! [`RegistrySnapshot`] taken before the run starts, so later registrations
//! are never observed mid-run.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::models::{Availability, Entity, EntityKind};

/// Entities available to a generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Entity>", into = "Vec<Entity>")]
pub struct EntityRegistry {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
}

impl EntityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity.
    ///
    /// Fails with `DuplicateEntity` if the ID is taken, or `InvalidCapacity`
    /// if capacity is zero.
    pub fn register(&mut self, entity: Entity) -> Result<(), RequestError> {
        if self.index.contains_key(&entity.id) {
            return Err(RequestError::DuplicateEntity(entity.id));
        }
        entity.check()?;
        self.index.insert(entity.id.clone(), self.entities.len());
        self.entities.push(entity);
        Ok(())
    }

    /// Builder: registers an entity and returns self.
    pub fn with(mut self, entity: Entity) -> Result<Self, RequestError> {
        self.register(entity)?;
        Ok(self)
    }

    /// Looks up an entity.
    pub fn get(&self, entity_id: &str) -> Option<&Entity> {
        self.index.get(entity_id).map(|&i| &self.entities[i])
    }

    /// Availability of an entity, or `UnknownEntity`.
    pub fn availability_of(&self, entity_id: &str) -> Result<&Availability, RequestError> {
        self.get(entity_id)
            .map(|e| &e.availability)
            .ok_or_else(|| RequestError::UnknownEntity(entity_id.to_string()))
    }

    /// Entities of a kind, in registration order.
    pub fn of_kind<'a>(&'a self, kind: &'a EntityKind) -> impl Iterator<Item = &'a Entity> + 'a {
        self.entities.iter().filter(move |e| &e.kind == kind)
    }

    /// Whether any entity of `kind` is registered.
    pub fn has_kind(&self, kind: &EntityKind) -> bool {
        self.entities.iter().any(|e| &e.kind == kind)
    }

    /// All entities in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Freezes the current contents for a run.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            inner: Arc::new(self.clone()),
        }
    }
}

impl TryFrom<Vec<Entity>> for EntityRegistry {
    type Error = RequestError;

    fn try_from(entities: Vec<Entity>) -> Result<Self, Self::Error> {
        let mut registry = Self::new();
        for entity in entities {
            registry.register(entity)?;
        }
        Ok(registry)
    }
}

impl From<EntityRegistry> for Vec<Entity> {
    fn from(registry: EntityRegistry) -> Self {
        registry.entities
    }
}

/// Immutable, cheaply clonable view of a registry at one point in time.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    inner: Arc<EntityRegistry>,
}

impl Deref for RegistrySnapshot {
    type Target = EntityRegistry;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<EntityRegistry> for RegistrySnapshot {
    fn from(registry: EntityRegistry) -> Self {
        Self {
            inner: Arc::new(registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeSlot;

    fn sample_registry() -> EntityRegistry {
        EntityRegistry::new()
            .with(Entity::person("T1").available(vec![TimeSlot::new(0, 100)]).unwrap())
            .unwrap()
            .with(Entity::room("R1").with_capacity(20))
            .unwrap()
            .with(Entity::room("R2"))
            .unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = sample_registry();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("R1").unwrap().capacity, 20);
        assert!(registry.get("R9").is_none());
        assert_eq!(registry.availability_of("T1").unwrap().total_ms(), 100);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = sample_registry();
        let err = registry.register(Entity::room("R1")).unwrap_err();
        assert_eq!(err, RequestError::DuplicateEntity("R1".into()));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_unknown_entity() {
        let registry = sample_registry();
        assert_eq!(
            registry.availability_of("nobody"),
            Err(RequestError::UnknownEntity("nobody".into()))
        );
    }

    #[test]
    fn test_of_kind_keeps_registration_order() {
        let registry = sample_registry();
        let rooms: Vec<&str> = registry
            .of_kind(&EntityKind::Room)
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(rooms, vec!["R1", "R2"]);
        assert!(registry.has_kind(&EntityKind::Person));
        assert!(!registry.has_kind(&EntityKind::Equipment));
    }

    #[test]
    fn test_snapshot_is_isolated() {
        let mut registry = sample_registry();
        let snapshot = registry.snapshot();
        registry.register(Entity::equipment("E1")).unwrap();

        assert_eq!(registry.len(), 4);
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.get("E1").is_none());
    }

    #[test]
    fn test_snapshot_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RegistrySnapshot>();
    }

    #[test]
    fn test_json_goes_through_register() {
        let dup = r#"[{"id":"R1","kind":"room"},{"id":"R1","kind":"room"}]"#;
        assert!(serde_json::from_str::<EntityRegistry>(dup).is_err());

        let zero = r#"[{"id":"R1","kind":"room","capacity":0}]"#;
        assert!(serde_json::from_str::<EntityRegistry>(zero).is_err());

        let ok = r#"[{"id":"R1","kind":"room"},{"id":"T1","kind":"person"}]"#;
        let registry: EntityRegistry = serde_json::from_str(ok).unwrap();
        assert_eq!(registry.len(), 2);
    }
}
