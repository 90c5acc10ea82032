use client_core::{Entity, EntityMetadata};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::protocol::ResourceMetadata;

/// Keyed by journal, period and year together. Controllers for this type can be
/// created, but every operation needing an identifier fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalStatus {
    #[serde(rename = "__metadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResourceMetadata>,
    #[serde(rename = "Journal", default)]
    pub journal: Option<String>,
    #[serde(rename = "Period", default)]
    pub period: Option<i32>,
    #[serde(rename = "Year", default)]
    pub year: Option<i32>,
    #[serde(rename = "Status", default)]
    pub status: Option<i32>,
    #[serde(rename = "StatusDescription", default)]
    pub status_description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for JournalStatus {
    const METADATA: Option<EntityMetadata> = Some(EntityMetadata {
        name: "JournalStatus",
        endpoint: "financial/JournalStatusList",
        keys: &["Journal", "Period", "Year"],
    });
}
