//! Typed entity controllers over an OData v2 style REST API.
//!
//! A [`Session`] hands out one [`Controller`] per entity type. Controllers share
//! the session's [`ManagedEntityRegistry`], so an entity fetched through one
//! controller (including entities inlined in another entity's payload) is known
//! as managed by every controller of the session.

pub mod config;
pub mod controller;
pub mod converter;
pub mod entity;
pub mod error;
pub mod query;
pub mod registry;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use config::{load_settings, ClientSettings};
pub use controller::{Controller, EntityPage};
pub use entity::{
    Entity, EntityManager, EntityMetadata, KeyDescriptor, ManagerResolver, NestedCollection,
};
pub use error::{ControllerError, Result, COMPOUND_KEY_MESSAGE};
pub use query::QueryParameters;
pub use registry::{ManagedEntityRegistry, ManagedEntry, PendingRegistration};
pub use session::{ControllerSingleton, Session};
pub use transport::{ApiConnection, ApiConnector, HttpApiConnection, HttpApiConnector};

#[cfg(test)]
#[path = "tests/fixtures.rs"]
mod fixtures;
