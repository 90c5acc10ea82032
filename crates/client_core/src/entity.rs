//! Static entity metadata and key resolution.
//!
//! Every entity type declares its endpoint and key fields through [`Entity::METADATA`].
//! A type without metadata cannot back a controller; a type with anything other than
//! exactly one key field can back one, but fails as soon as an identifier is needed.

use std::{any::type_name, fmt, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    error::{ControllerError, Result},
    registry::PendingRegistration,
    session::{entity_manager_for, Session},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityMetadata {
    /// Entity set name, also the registry namespace for identifiers.
    pub name: &'static str,
    /// Path below the division root, e.g. `crm/Accounts`.
    pub endpoint: &'static str,
    pub keys: &'static [&'static str],
}

pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const METADATA: Option<EntityMetadata>;

    fn nested_collections() -> Vec<NestedCollection> {
        Vec::new()
    }
}

pub(crate) fn metadata_of<T: Entity>() -> Result<EntityMetadata> {
    T::METADATA.ok_or(ControllerError::TypeError {
        type_name: type_name::<T>(),
    })
}

pub type ManagerFactory = fn(&Session) -> Result<Arc<dyn EntityManager>>;

/// A navigation property of a parent entity holding entities of another type.
#[derive(Clone, Copy)]
pub struct NestedCollection {
    pub field: &'static str,
    pub entity: &'static str,
    factory: ManagerFactory,
}

impl NestedCollection {
    pub fn of<C: Entity>(field: &'static str) -> Self {
        Self {
            field,
            entity: C::METADATA
                .map(|metadata| metadata.name)
                .unwrap_or_else(type_name::<C>),
            factory: entity_manager_for::<C>,
        }
    }

    pub(crate) fn factory(&self) -> ManagerFactory {
        self.factory
    }
}

impl fmt::Debug for NestedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedCollection")
            .field("field", &self.field)
            .field("entity", &self.entity)
            .finish()
    }
}

/// Type-erased view of a controller, used to hand nested payloads to the
/// controller responsible for their type.
pub trait EntityManager: Send + Sync {
    fn entity_name(&self) -> &'static str;

    /// Decodes a raw payload of this manager's type, with its own inline nested
    /// entities, into registrations the caller commits once the enclosing payload
    /// decoded in full.
    fn decode_raw(&self, raw: &Value) -> Result<Vec<PendingRegistration>>;

    fn is_managed_identifier(&self, identifier: &str) -> bool;
}

pub type ManagerResolver =
    Arc<dyn Fn(&NestedCollection) -> Result<Arc<dyn EntityManager>> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    entity: &'static str,
    fields: Vec<&'static str>,
}

impl KeyDescriptor {
    pub fn resolve<T: Entity>() -> Result<Self> {
        metadata_of::<T>().map(|metadata| Self::from_metadata(&metadata))
    }

    pub fn from_metadata(metadata: &EntityMetadata) -> Self {
        Self {
            entity: metadata.name,
            fields: metadata.keys.to_vec(),
        }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    pub fn key_field(&self) -> Result<&'static str> {
        match self.fields.as_slice() {
            [field] => Ok(*field),
            _ => Err(ControllerError::NotSupported),
        }
    }

    /// Identifier of a serialized entity document.
    pub fn identifier_value(&self, document: &Value) -> Result<String> {
        let field = self.key_field()?;
        match document.get(field) {
            None | Some(Value::Null) => Err(ControllerError::MissingIdentifier {
                entity: self.entity,
                field,
            }),
            Some(Value::String(value)) => Ok(value.clone()),
            Some(other) => Ok(other.to_string()),
        }
    }

    pub fn identifier_of<T: Entity>(&self, entity: &T) -> Result<String> {
        self.key_field()?;
        let document =
            serde_json::to_value(entity).map_err(ControllerError::payload(self.entity))?;
        self.identifier_value(&document)
    }
}

#[cfg(test)]
#[path = "tests/entity_tests.rs"]
mod tests;
