//! Session-scoped controller cache and the process-wide session table.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak},
};

use tracing::info;

use crate::{
    controller::Controller,
    entity::{metadata_of, Entity, EntityManager, ManagerResolver, NestedCollection},
    error::{ControllerError, Result},
    registry::ManagedEntityRegistry,
    transport::ApiConnector,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Controllers and the identity map shared across one connector + session token.
pub struct Session {
    connector: Arc<dyn ApiConnector>,
    session_token: String,
    registry: Arc<ManagedEntityRegistry>,
    controllers: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    managers: Mutex<HashMap<&'static str, Arc<dyn EntityManager>>>,
    this: Weak<Session>,
}

impl Session {
    pub fn new(connector: Arc<dyn ApiConnector>, session_token: impl Into<String>) -> Arc<Self> {
        let session_token = session_token.into();
        Arc::new_cyclic(|this| Self {
            connector,
            session_token,
            registry: Arc::new(ManagedEntityRegistry::new()),
            controllers: Mutex::new(HashMap::new()),
            managers: Mutex::new(HashMap::new()),
            this: this.clone(),
        })
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    pub fn connector(&self) -> &Arc<dyn ApiConnector> {
        &self.connector
    }

    pub fn registry(&self) -> &Arc<ManagedEntityRegistry> {
        &self.registry
    }

    /// Returns the session's controller for `T`, creating it on first use.
    pub fn get_controller<T: Entity>(&self) -> Result<Arc<Controller<T>>> {
        let mut controllers = lock(&self.controllers);
        if let Some(existing) = controllers.get(&TypeId::of::<T>()) {
            if let Ok(controller) = Arc::clone(existing).downcast::<Controller<T>>() {
                return Ok(controller);
            }
        }

        let metadata = metadata_of::<T>()?;
        let connection = self
            .connector
            .connection(metadata.endpoint, &self.session_token);
        let controller = Arc::new(Controller::<T>::with_registry(
            Some(connection),
            Arc::clone(&self.registry),
        )?);
        controller.set_manager_resolver(self.manager_resolver());

        controllers.insert(TypeId::of::<T>(), controller.clone());
        lock(&self.managers).insert(metadata.name, controller.clone());
        info!(
            entity = metadata.name,
            endpoint = metadata.endpoint,
            "session: controller created"
        );
        Ok(controller)
    }

    /// Manager of an entity type whose controller already exists in this session.
    pub fn get_entity_manager(&self, entity: &str) -> Option<Arc<dyn EntityManager>> {
        lock(&self.managers).get(entity).cloned()
    }

    fn resolve_nested(&self, nested: &NestedCollection) -> Result<Arc<dyn EntityManager>> {
        if let Some(manager) = self.get_entity_manager(nested.entity) {
            return Ok(manager);
        }
        (nested.factory())(self)
    }

    /// Resolver handed to controllers; holds the session weakly.
    pub fn manager_resolver(&self) -> ManagerResolver {
        let session = self.this.clone();
        Arc::new(move |nested: &NestedCollection| -> Result<Arc<dyn EntityManager>> {
            session
                .upgrade()
                .ok_or(ControllerError::SessionClosed)?
                .resolve_nested(nested)
        })
    }
}

pub(crate) fn entity_manager_for<C: Entity>(session: &Session) -> Result<Arc<dyn EntityManager>> {
    let controller: Arc<dyn EntityManager> = session.get_controller::<C>()?;
    Ok(controller)
}

/// Connector identity plus session token. The table holds the connector, so its
/// address stays unique while the entry lives.
type SessionKey = (usize, String);

fn connector_identity(connector: &Arc<dyn ApiConnector>) -> usize {
    Arc::as_ptr(connector) as *const () as usize
}

/// Table of live sessions keyed by (connector, session token).
#[derive(Default)]
pub struct ControllerSingleton {
    sessions: Mutex<HashMap<SessionKey, Arc<Session>>>,
}

impl ControllerSingleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide table; reset it with [`ControllerSingleton::clean`].
    pub fn global() -> &'static ControllerSingleton {
        static GLOBAL: OnceLock<ControllerSingleton> = OnceLock::new();
        GLOBAL.get_or_init(ControllerSingleton::new)
    }

    pub fn get_instance(
        &self,
        connector: Arc<dyn ApiConnector>,
        session_token: &str,
    ) -> Arc<Session> {
        let key = (connector_identity(&connector), session_token.to_string());
        let mut sessions = lock(&self.sessions);
        let session = sessions.entry(key).or_insert_with(|| {
            info!(
                base_url = connector.base_url(),
                session_token, "session: created"
            );
            Session::new(Arc::clone(&connector), session_token)
        });
        Arc::clone(session)
    }

    pub fn clean(&self) {
        let dropped = lock(&self.sessions).drain().count();
        info!(dropped, "session: all sessions cleared");
    }

    pub fn session_count(&self) -> usize {
        lock(&self.sessions).len()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
