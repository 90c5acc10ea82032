//! Builds the JSON documents sent on create and update.

use serde_json::{Map, Value};
use shared::protocol::{is_deferred, METADATA_FIELD};

/// Drops `__metadata`, deferred navigation links and null fields, recursively
/// through inline collections.
pub fn to_wire_document(document: &Value) -> Value {
    match document {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .filter(|(name, value)| {
                    name.as_str() != METADATA_FIELD && !value.is_null() && !is_deferred(value)
                })
                .map(|(name, value)| (name.clone(), to_wire_document(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(to_wire_document).collect()),
        other => other.clone(),
    }
}

/// Top-level wire fields of `current` that differ from `original`. A field
/// cleared since the snapshot is reported as an explicit null.
pub fn changed_fields(original: &Value, current: &Value) -> Map<String, Value> {
    let Value::Object(current) = current else {
        return Map::new();
    };
    current
        .iter()
        .filter(|(name, value)| name.as_str() != METADATA_FIELD && !is_deferred(value))
        .filter_map(|(name, value)| {
            let before = original
                .get(name.as_str())
                .filter(|before| !before.is_null())
                .map(to_wire_document);
            let after = (!value.is_null()).then(|| to_wire_document(value));
            (before != after).then(|| (name.clone(), after.unwrap_or(Value::Null)))
        })
        .collect()
}

/// Document for an update: the changed fields when a snapshot is known,
/// otherwise the full wire document. The key field is always included.
pub fn update_document(snapshot: Option<&Value>, current: &Value, key_field: &str) -> Value {
    let Some(snapshot) = snapshot else {
        return to_wire_document(current);
    };
    let mut changed = changed_fields(snapshot, current);
    if let Some(key) = current.get(key_field).filter(|key| !key.is_null()) {
        changed.insert(key_field.to_string(), key.clone());
    }
    Value::Object(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_document_strips_bookkeeping_fields() {
        let document = json!({
            "__metadata": {"uri": "https://host/x", "type": "Exact.Web.Api.Models.SalesInvoice"},
            "InvoiceID": "0f8f1d9d-8a1e-49a2-b3ad-6664f58b4982",
            "Remarks": null,
            "SalesInvoiceLines": {"__deferred": {"uri": "https://host/x/Lines"}},
            "Lines": [{"__metadata": {"uri": "u", "type": "t"}, "ID": "l1", "Notes": null}]
        });
        assert_eq!(
            to_wire_document(&document),
            json!({
                "InvoiceID": "0f8f1d9d-8a1e-49a2-b3ad-6664f58b4982",
                "Lines": [{"ID": "l1"}]
            })
        );
    }

    #[test]
    fn update_document_sends_changes_and_key() {
        let snapshot = json!({"ID": "a1", "Name": "Old", "City": "Delft"});
        let current = json!({"ID": "a1", "Name": "New", "City": "Delft"});
        assert_eq!(
            update_document(Some(&snapshot), &current, "ID"),
            json!({"ID": "a1", "Name": "New"})
        );
    }

    #[test]
    fn cleared_field_is_sent_as_null() {
        let snapshot = json!({"ID": "a1", "Email": "info@example.com", "Phone": null});
        let current = json!({"ID": "a1", "Email": null, "Phone": null});
        assert_eq!(
            changed_fields(&snapshot, &current),
            json!({"Email": null}).as_object().cloned().expect("object")
        );
    }

    #[test]
    fn update_document_without_snapshot_sends_everything() {
        let current = json!({"ID": "a1", "Name": "New", "Email": null});
        assert_eq!(
            update_document(None, &current, "ID"),
            json!({"ID": "a1", "Name": "New"})
        );
    }
}
