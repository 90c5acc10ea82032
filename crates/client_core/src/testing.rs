//! In-memory transport doubles for tests of code built on the controllers.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use shared::error::ApiException;

use crate::transport::{ApiConnection, ApiConnector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Get {
        parameters: String,
    },
    GetEntity {
        key_name: String,
        identifier: String,
        parameters: String,
    },
    Post {
        data: String,
    },
    Put {
        key_name: String,
        identifier: String,
        data: String,
    },
    Delete {
        key_name: String,
        identifier: String,
    },
    Count {
        parameters: String,
    },
}

#[derive(Default)]
struct MockState {
    collection: Vec<Value>,
    next_link: Option<String>,
    entities: HashMap<String, Value>,
    post_response: Option<Value>,
    reject_writes: bool,
    fail_with: Option<String>,
    calls: Vec<RecordedCall>,
}

/// Entity-set double answering from canned payloads and recording every call.
///
/// `get_entity` answers from entities registered with [`MockApiConnection::with_entity`]
/// and fails like a 404 otherwise. `post` echoes the posted document unless a response
/// was configured. `put` and `delete` confirm unless writes are rejected.
#[derive(Default)]
pub struct MockApiConnection {
    state: Mutex<MockState>,
}

impl MockApiConnection {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_collection(self, items: Vec<Value>) -> Self {
        self.state().collection = items;
        self
    }

    pub fn with_next_link(self, next: impl Into<String>) -> Self {
        self.state().next_link = Some(next.into());
        self
    }

    pub fn with_entity(self, identifier: impl Into<String>, entity: Value) -> Self {
        self.state().entities.insert(identifier.into(), entity);
        self
    }

    pub fn with_post_response(self, entity: Value) -> Self {
        self.state().post_response = Some(entity);
        self
    }

    pub fn rejecting_writes(self) -> Self {
        self.state().reject_writes = true;
        self
    }

    pub fn failing(self, message: impl Into<String>) -> Self {
        self.state().fail_with = Some(message.into());
        self
    }

    pub fn set_collection(&self, items: Vec<Value>) {
        self.state().collection = items;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    fn record(&self, call: RecordedCall) -> Result<()> {
        let mut state = self.state();
        state.calls.push(call);
        match &state.fail_with {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ApiConnection for MockApiConnection {
    async fn get(&self, parameters: &str) -> Result<String> {
        self.record(RecordedCall::Get {
            parameters: parameters.to_string(),
        })?;
        let state = self.state();
        let mut body = json!({ "results": state.collection });
        if let Some(next) = &state.next_link {
            body["__next"] = json!(next);
        }
        Ok(json!({ "d": body }).to_string())
    }

    async fn get_entity(
        &self,
        key_name: &str,
        identifier: &str,
        parameters: &str,
    ) -> Result<String> {
        self.record(RecordedCall::GetEntity {
            key_name: key_name.to_string(),
            identifier: identifier.to_string(),
            parameters: parameters.to_string(),
        })?;
        match self.state().entities.get(identifier) {
            Some(entity) => Ok(json!({ "d": entity }).to_string()),
            None => Err(ApiException::new(404, "").into()),
        }
    }

    async fn post(&self, data: &str) -> Result<String> {
        self.record(RecordedCall::Post {
            data: data.to_string(),
        })?;
        let entity = match &self.state().post_response {
            Some(response) => response.clone(),
            None => serde_json::from_str(data)?,
        };
        Ok(json!({ "d": entity }).to_string())
    }

    async fn put(&self, key_name: &str, identifier: &str, data: &str) -> Result<bool> {
        self.record(RecordedCall::Put {
            key_name: key_name.to_string(),
            identifier: identifier.to_string(),
            data: data.to_string(),
        })?;
        Ok(!self.state().reject_writes)
    }

    async fn delete(&self, key_name: &str, identifier: &str) -> Result<bool> {
        self.record(RecordedCall::Delete {
            key_name: key_name.to_string(),
            identifier: identifier.to_string(),
        })?;
        Ok(!self.state().reject_writes)
    }

    async fn count(&self, parameters: &str) -> Result<usize> {
        self.record(RecordedCall::Count {
            parameters: parameters.to_string(),
        })?;
        Ok(self.state().collection.len())
    }
}

/// Connector handing out one [`MockApiConnection`] per endpoint.
pub struct MockApiConnector {
    base_url: String,
    connections: Mutex<HashMap<String, Arc<MockApiConnection>>>,
}

impl MockApiConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_connection(self, endpoint: &str, connection: MockApiConnection) -> Self {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint.to_string(), Arc::new(connection));
        self
    }

    /// The double serving `endpoint`, created empty on first use.
    pub fn endpoint(&self, endpoint: &str) -> Arc<MockApiConnection> {
        Arc::clone(
            self.connections
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(endpoint.to_string())
                .or_default(),
        )
    }
}

impl ApiConnector for MockApiConnector {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn connection(&self, endpoint: &str, _session_token: &str) -> Arc<dyn ApiConnection> {
        self.endpoint(endpoint)
    }
}
