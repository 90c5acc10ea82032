//! Identity map of entities known to exist remotely.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntityKey {
    entity: &'static str,
    identifier: String,
}

impl EntityKey {
    fn new(entity: &'static str, identifier: &str) -> Self {
        Self {
            entity,
            identifier: identifier.to_string(),
        }
    }
}

/// Last confirmed remote state of a managed entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedEntry {
    pub snapshot: Value,
    pub registered_at: DateTime<Utc>,
}

/// Shared by every controller of a session. Presence of an entry means managed.
#[derive(Debug, Default)]
pub struct ManagedEntityRegistry {
    entries: RwLock<HashMap<EntityKey, ManagedEntry>>,
}

impl ManagedEntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<EntityKey, ManagedEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<EntityKey, ManagedEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records (or refreshes in place) the managed entry for `(entity, identifier)`.
    pub fn register(&self, entity: &'static str, identifier: &str, snapshot: Value) {
        let registered_at = Utc::now();
        let entry = ManagedEntry {
            snapshot,
            registered_at,
        };
        let previous = self
            .write()
            .insert(EntityKey::new(entity, identifier), entry);
        match previous {
            Some(previous) => debug!(
                entity,
                identifier,
                managed_for_ms = (registered_at - previous.registered_at).num_milliseconds(),
                "registry: managed entity refreshed"
            ),
            None => debug!(entity, identifier, "registry: entity managed"),
        }
    }

    /// Returns whether an entry was removed.
    pub fn unregister(&self, entity: &'static str, identifier: &str) -> bool {
        let removed = self
            .write()
            .remove(&EntityKey::new(entity, identifier))
            .is_some();
        debug!(entity, identifier, removed, "registry: entity released");
        removed
    }

    pub fn is_managed(&self, entity: &'static str, identifier: &str) -> bool {
        self.read()
            .contains_key(&EntityKey::new(entity, identifier))
    }

    pub fn entry(&self, entity: &'static str, identifier: &str) -> Option<ManagedEntry> {
        self.read().get(&EntityKey::new(entity, identifier)).cloned()
    }

    pub fn snapshot(&self, entity: &'static str, identifier: &str) -> Option<Value> {
        self.entry(entity, identifier).map(|entry| entry.snapshot)
    }

    /// Identifiers currently managed for one entity type, sorted.
    pub fn managed_identifiers(&self, entity: &str) -> Vec<String> {
        let mut identifiers: Vec<String> = self
            .read()
            .keys()
            .filter(|key| key.entity == entity)
            .map(|key| key.identifier.clone())
            .collect();
        identifiers.sort();
        identifiers
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }
}

/// A decoded entity that becomes managed only once its whole payload decoded.
#[derive(Debug, Clone)]
pub struct PendingRegistration {
    registry: Arc<ManagedEntityRegistry>,
    entity: &'static str,
    identifier: String,
    snapshot: Value,
}

impl PendingRegistration {
    pub fn new(
        registry: Arc<ManagedEntityRegistry>,
        entity: &'static str,
        identifier: String,
        snapshot: Value,
    ) -> Self {
        Self {
            registry,
            entity,
            identifier,
            snapshot,
        }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn commit(self) {
        self.registry
            .register(self.entity, &self.identifier, self.snapshot);
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
