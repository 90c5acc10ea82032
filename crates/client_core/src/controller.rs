use std::{
    marker::PhantomData,
    sync::{Arc, OnceLock, PoisonError, RwLock},
};

use serde_json::Value;
use shared::protocol::{inline_items, parse_collection, parse_single};
use tracing::{debug, warn};

use crate::{
    converter::{to_wire_document, update_document},
    entity::{metadata_of, Entity, EntityManager, EntityMetadata, KeyDescriptor, ManagerResolver},
    error::{ControllerError, Result},
    registry::{ManagedEntityRegistry, PendingRegistration},
    transport::ApiConnection,
};

/// One page of a list response; `next` is the continuation link, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPage<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

/// Typed CRUD access to one entity set.
///
/// Every entity returned or confirmed by the remote side is registered in the
/// controller's [`ManagedEntityRegistry`]; a successful delete releases it.
/// Controllers obtained from the same [`crate::Session`] share one registry, and
/// nested collections inlined in a payload are handed to the controller of the
/// nested type through the injected [`ManagerResolver`].
pub struct Controller<T: Entity> {
    connection: Arc<dyn ApiConnection>,
    metadata: EntityMetadata,
    keys: OnceLock<KeyDescriptor>,
    registry: Arc<ManagedEntityRegistry>,
    manager_resolver: RwLock<Option<ManagerResolver>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Controller<T> {
    /// Controller with a private registry.
    pub fn new(connection: Option<Arc<dyn ApiConnection>>) -> Result<Self> {
        Self::with_registry(connection, Arc::new(ManagedEntityRegistry::new()))
    }

    pub fn with_registry(
        connection: Option<Arc<dyn ApiConnection>>,
        registry: Arc<ManagedEntityRegistry>,
    ) -> Result<Self> {
        let connection = connection.ok_or(ControllerError::ArgumentError("connection"))?;
        let metadata = metadata_of::<T>()?;
        Ok(Self {
            connection,
            metadata,
            keys: OnceLock::new(),
            registry,
            manager_resolver: RwLock::new(None),
            _entity: PhantomData,
        })
    }

    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    pub fn registry(&self) -> &Arc<ManagedEntityRegistry> {
        &self.registry
    }

    pub fn key_descriptor(&self) -> &KeyDescriptor {
        self.keys
            .get_or_init(|| KeyDescriptor::from_metadata(&self.metadata))
    }

    pub fn set_manager_resolver(&self, resolver: ManagerResolver) {
        *self
            .manager_resolver
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(resolver);
    }

    fn manager_resolver(&self) -> Option<ManagerResolver> {
        self.manager_resolver
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn identifier_value(&self, entity: &T) -> Result<String> {
        self.key_descriptor().identifier_of(entity)
    }

    /// A transient entity without a key value is unmanaged; compound keys still fail.
    pub fn is_managed_entity(&self, entity: &T) -> Result<bool> {
        match self.identifier_value(entity) {
            Ok(identifier) => Ok(self.registry.is_managed(self.metadata.name, &identifier)),
            Err(ControllerError::MissingIdentifier { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub async fn get(&self, parameters: &str) -> Result<Vec<T>> {
        Ok(self.get_page(parameters).await?.items)
    }

    pub async fn get_page(&self, parameters: &str) -> Result<EntityPage<T>> {
        let raw = self.connection.get(parameters).await?;
        let page = parse_collection(&raw).map_err(ControllerError::payload(self.metadata.name))?;
        // Nothing from the page is registered unless every item decodes.
        let decoded = page
            .items
            .iter()
            .map(|item| self.decode(item))
            .collect::<Result<Vec<_>>>()?;
        let items: Vec<T> = decoded
            .into_iter()
            .map(|decoded| decoded.commit().0)
            .collect();
        debug!(
            entity = self.metadata.name,
            count = items.len(),
            has_next = page.next.is_some(),
            "controller: fetched collection"
        );
        Ok(EntityPage {
            items,
            next: page.next,
        })
    }

    pub async fn get_entity(&self, identifier: &str, parameters: &str) -> Result<T> {
        let key_field = self.key_descriptor().key_field()?;
        let raw = self
            .connection
            .get_entity(key_field, identifier, parameters)
            .await?;
        let item = parse_single(&raw)
            .map_err(ControllerError::payload(self.metadata.name))?
            .ok_or_else(|| ControllerError::NotFound {
                entity: self.metadata.name,
                identifier: identifier.to_string(),
            })?;
        let (entity, _) = self.decode(&item)?.commit();
        Ok(entity)
    }

    pub async fn count(&self, parameters: &str) -> Result<usize> {
        Ok(self.connection.count(parameters).await?)
    }

    /// On success `entity` is replaced by the server's representation, which
    /// carries any remotely assigned identifier.
    pub async fn create(&self, entity: &mut T) -> Result<bool> {
        let document = self.document(entity)?;
        let data = to_wire_document(&document).to_string();
        let raw = self.connection.post(&data).await?;
        if raw.trim().is_empty() {
            warn!(entity = self.metadata.name, "controller: create returned no entity");
            return Ok(false);
        }
        let Some(item) =
            parse_single(&raw).map_err(ControllerError::payload(self.metadata.name))?
        else {
            warn!(entity = self.metadata.name, "controller: create returned no entity");
            return Ok(false);
        };
        let (created, identifier) = self.decode(&item)?.commit();
        debug!(entity = self.metadata.name, %identifier, "controller: created");
        *entity = created;
        Ok(true)
    }

    /// Managed entities send only the fields changed since their snapshot;
    /// unmanaged ones send their full document.
    pub async fn update(&self, entity: Option<&T>) -> Result<bool> {
        let entity = entity.ok_or(ControllerError::ArgumentError("entity"))?;
        let keys = self.key_descriptor();
        let key_field = keys.key_field()?;
        let document = self.document(entity)?;
        let identifier = keys.identifier_value(&document)?;
        let snapshot = self.registry.snapshot(self.metadata.name, &identifier);
        let data = update_document(snapshot.as_ref(), &document, key_field).to_string();

        let updated = self.connection.put(key_field, &identifier, &data).await?;
        if updated {
            self.registry
                .register(self.metadata.name, &identifier, document);
        } else {
            warn!(entity = self.metadata.name, %identifier, "controller: update not confirmed");
        }
        Ok(updated)
    }

    pub async fn delete(&self, entity: Option<&T>) -> Result<bool> {
        let entity = entity.ok_or(ControllerError::ArgumentError("entity"))?;
        let keys = self.key_descriptor();
        let key_field = keys.key_field()?;
        let identifier = keys.identifier_of(entity)?;

        let deleted = self.connection.delete(key_field, &identifier).await?;
        if deleted {
            self.registry.unregister(self.metadata.name, &identifier);
        } else {
            warn!(entity = self.metadata.name, %identifier, "controller: delete not confirmed");
        }
        Ok(deleted)
    }

    fn document(&self, entity: &T) -> Result<Value> {
        serde_json::to_value(entity).map_err(ControllerError::payload(self.metadata.name))
    }

    /// Decodes one payload and its inline nested entities without registering
    /// anything; the returned registrations cover the entity and its children.
    fn decode(&self, raw: &Value) -> Result<Decoded<T>> {
        let entity = T::deserialize(raw).map_err(ControllerError::payload(self.metadata.name))?;
        let document = self.document(&entity)?;
        let identifier = self.key_descriptor().identifier_value(&document)?;
        let mut pending = self.decode_nested(raw)?;
        pending.push(PendingRegistration::new(
            Arc::clone(&self.registry),
            self.metadata.name,
            identifier.clone(),
            document,
        ));
        Ok(Decoded {
            entity,
            identifier,
            pending,
        })
    }

    fn decode_nested(&self, raw: &Value) -> Result<Vec<PendingRegistration>> {
        let mut pending = Vec::new();
        for collection in T::nested_collections() {
            // Deferred links and absent fields carry nothing to track yet.
            let Some(items) = raw.get(collection.field).and_then(inline_items) else {
                continue;
            };
            if items.is_empty() {
                continue;
            }
            let Some(resolver) = self.manager_resolver() else {
                warn!(
                    entity = self.metadata.name,
                    field = collection.field,
                    "controller: no entity manager resolver, nested entities left unmanaged"
                );
                continue;
            };
            let manager = resolver(&collection)?;
            for item in items {
                pending.extend(manager.decode_raw(item)?);
            }
            debug!(
                entity = self.metadata.name,
                field = collection.field,
                nested = collection.entity,
                count = items.len(),
                "controller: nested entities decoded"
            );
        }
        Ok(pending)
    }
}

/// An entity decoded from a payload, not yet registered.
struct Decoded<T> {
    entity: T,
    identifier: String,
    pending: Vec<PendingRegistration>,
}

impl<T> Decoded<T> {
    fn commit(self) -> (T, String) {
        for registration in self.pending {
            registration.commit();
        }
        (self.entity, self.identifier)
    }
}

impl<T: Entity> EntityManager for Controller<T> {
    fn entity_name(&self) -> &'static str {
        self.metadata.name
    }

    fn decode_raw(&self, raw: &Value) -> Result<Vec<PendingRegistration>> {
        self.decode(raw).map(|decoded| decoded.pending)
    }

    fn is_managed_identifier(&self, identifier: &str) -> bool {
        self.registry.is_managed(self.metadata.name, identifier)
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
