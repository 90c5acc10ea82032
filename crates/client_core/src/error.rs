use thiserror::Error;

pub const COMPOUND_KEY_MESSAGE: &str =
    "Currently the SDK doesn't support entities with a compound key.";

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("type `{type_name}` is not a mapped entity type")]
    TypeError { type_name: &'static str },
    #[error("argument `{0}` is required")]
    ArgumentError(&'static str),
    #[error("Currently the SDK doesn't support entities with a compound key.")]
    NotSupported,
    #[error("{entity} has no value for key field `{field}`")]
    MissingIdentifier {
        entity: &'static str,
        field: &'static str,
    },
    #[error("{entity} `{identifier}` was not found")]
    NotFound {
        entity: &'static str,
        identifier: String,
    },
    #[error("invalid {entity} payload: {source}")]
    Payload {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("session is no longer available")]
    SessionClosed,
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl ControllerError {
    pub(crate) fn payload(entity: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| Self::Payload { entity, source }
    }
}

pub type Result<T, E = ControllerError> = std::result::Result<T, E>;
