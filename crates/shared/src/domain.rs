use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier rendered as an OData key predicate, e.g. `guid'…'`, `42` or `'ABC'`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum KeyLiteral {
    Guid(Uuid),
    Int(i64),
    Text(String),
}

impl KeyLiteral {
    pub fn parse(identifier: &str) -> Self {
        if let Ok(guid) = Uuid::parse_str(identifier) {
            return Self::Guid(guid);
        }
        if let Ok(value) = identifier.parse::<i64>() {
            return Self::Int(value);
        }
        Self::Text(identifier.to_string())
    }
}

impl fmt::Display for KeyLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guid(guid) => write!(f, "guid'{guid}'"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(text) => write!(f, "'{}'", text.replace('\'', "''")),
        }
    }
}
