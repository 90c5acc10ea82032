use chrono::{DateTime, Utc};
use client_core::{Entity, EntityMetadata, NestedCollection};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::protocol::{odata_date, Linked, ResourceMetadata};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesInvoice {
    #[serde(rename = "__metadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResourceMetadata>,
    #[serde(rename = "InvoiceID", default)]
    pub invoice_id: Option<String>,
    #[serde(rename = "InvoiceNumber", default)]
    pub invoice_number: Option<i64>,
    #[serde(rename = "OrderedBy", default)]
    pub ordered_by: Option<String>,
    #[serde(rename = "Journal", default)]
    pub journal: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Currency", default)]
    pub currency: Option<String>,
    #[serde(rename = "AmountDC", default)]
    pub amount_dc: Option<f64>,
    #[serde(rename = "InvoiceDate", default, with = "odata_date")]
    pub invoice_date: Option<DateTime<Utc>>,
    /// Inline when the payload expanded the lines, otherwise a deferred link.
    #[serde(
        rename = "SalesInvoiceLines",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub lines: Option<Linked<SalesInvoiceLine>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SalesInvoice {
    pub fn line_items(&self) -> &[SalesInvoiceLine] {
        self.lines.as_ref().map(Linked::items).unwrap_or_default()
    }
}

impl Entity for SalesInvoice {
    const METADATA: Option<EntityMetadata> = Some(EntityMetadata {
        name: "SalesInvoice",
        endpoint: "salesinvoice/SalesInvoices",
        keys: &["InvoiceID"],
    });

    fn nested_collections() -> Vec<NestedCollection> {
        vec![NestedCollection::of::<SalesInvoiceLine>("SalesInvoiceLines")]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesInvoiceLine {
    #[serde(rename = "__metadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResourceMetadata>,
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(rename = "InvoiceID", default)]
    pub invoice_id: Option<String>,
    #[serde(rename = "LineNumber", default)]
    pub line_number: Option<i32>,
    #[serde(rename = "Item", default)]
    pub item: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Quantity", default)]
    pub quantity: Option<f64>,
    #[serde(rename = "AmountFC", default)]
    pub amount_fc: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for SalesInvoiceLine {
    const METADATA: Option<EntityMetadata> = Some(EntityMetadata {
        name: "SalesInvoiceLine",
        endpoint: "salesinvoice/SalesInvoiceLines",
        keys: &["ID"],
    });
}
