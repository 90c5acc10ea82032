use chrono::{DateTime, Utc};
use client_core::{Entity, EntityMetadata};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::protocol::{odata_date, ResourceMetadata};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "__metadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResourceMetadata>,
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(rename = "Code", default)]
    pub code: Option<String>,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "City", default)]
    pub city: Option<String>,
    #[serde(rename = "Country", default)]
    pub country: Option<String>,
    #[serde(rename = "Email", default)]
    pub email: Option<String>,
    /// `C` customer, `S` suspect, `P` prospect, `A` none.
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(rename = "Created", default, with = "odata_date")]
    pub created: Option<DateTime<Utc>>,
    #[serde(rename = "Modified", default, with = "odata_date")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Account {
    const METADATA: Option<EntityMetadata> = Some(EntityMetadata {
        name: "Account",
        endpoint: "crm/Accounts",
        keys: &["ID"],
    });
}
