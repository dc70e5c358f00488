//! Optimistic edits on cached JSON.
//!
//! Collections are arrays of records with a numeric `id`; items are single
//! records. Anything else is returned unchanged.

use careboard_api_types::RecordId;
use serde_json::Value;

fn has_id(record: &Value, id: RecordId) -> bool {
    record.get("id").and_then(Value::as_i64) == Some(id)
}

/// Drop record `id` from a cached collection.
pub fn remove_by_id(current: Option<Value>, id: RecordId) -> Option<Value> {
    match current {
        Some(Value::Array(mut records)) => {
            records.retain(|record| !has_id(record, id));
            Some(Value::Array(records))
        }
        other => other,
    }
}

/// Negate the boolean `field` of record `id`, in a collection or a single
/// cached record. A missing field counts as `false`.
pub fn flip_field(current: Option<Value>, id: RecordId, field: &str) -> Option<Value> {
    match current {
        Some(Value::Array(mut records)) => {
            for record in records.iter_mut().filter(|r| has_id(r, id)) {
                flip(record, field);
            }
            Some(Value::Array(records))
        }
        Some(mut record) if has_id(&record, id) => {
            flip(&mut record, field);
            Some(record)
        }
        other => other,
    }
}

fn flip(record: &mut Value, field: &str) {
    if let Value::Object(map) = record {
        let next = !map.get(field).and_then(Value::as_bool).unwrap_or(false);
        map.insert(field.to_string(), Value::Bool(next));
    }
}
