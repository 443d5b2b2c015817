//! JSON boundary: OData v2 style feeds and entries to records and back.

use mockdb_core::{MockError, MockResult, Record, Value};
use mockdb_schema::{CollectionSchema, FieldSchema};
use serde_json::{Map, Number, Value as Json};

const METADATA: &str = "__metadata";

/// Entries of a feed document: `{"d":{"results":[..]}}`, `{"d":[..]}` or a bare array.
pub fn feed_entries(doc: &Json) -> MockResult<Vec<&Map<String, Json>>> {
    let items = match doc {
        Json::Array(items) => items,
        Json::Object(o) => match o.get("d") {
            Some(Json::Array(items)) => items,
            Some(Json::Object(d)) => match d.get("results") {
                Some(Json::Array(items)) => items,
                _ => return Err(MockError::InvalidInputShape("feed object without d.results array".into())),
            },
            _ => return Err(MockError::InvalidInputShape("feed object without d member".into())),
        },
        other => return Err(MockError::InvalidInputShape(format!("expected feed, got {}", json_kind(other)))),
    };
    items
        .iter()
        .enumerate()
        .map(|(i, e)| match e {
            Json::Object(o) => Ok(o),
            other => Err(MockError::InvalidInputShape(format!("entry {} is {}, expected object", i, json_kind(other)))),
        })
        .collect()
}

/// Convert one entry against the collection schema. `__metadata`, undeclared properties and
/// non-scalar fields are ignored.
pub fn record_from_json(collection: &CollectionSchema, entry: &Map<String, Json>) -> MockResult<Record> {
    let mut record = Record::with_capacity(entry.len());
    for (name, v) in entry {
        if name == METADATA {
            continue;
        }
        let Some(field) = collection.field(name) else { continue };
        if !field.field_type.is_scalar() {
            continue;
        }
        record.set(name.clone(), value_from_json(field, v)?);
    }
    Ok(record)
}

/// JSON strings go through the field's literal rule; numbers and booleans are rendered first.
pub fn value_from_json(field: &FieldSchema, v: &Json) -> MockResult<Value> {
    match v {
        Json::Null => Ok(Value::Null),
        Json::String(s) => field.field_type.parse_literal(s, &field.facets),
        Json::Bool(b) => field.field_type.parse_literal(if *b { "true" } else { "false" }, &field.facets),
        Json::Number(n) => field.field_type.parse_literal(&n.to_string(), &field.facets),
        other => Err(MockError::InvalidInputShape(format!("{}: expected scalar, got {}", field.name, json_kind(other)))),
    }
}

pub fn record_to_json(record: &Record) -> Json {
    let fields = record.iter().map(|(k, v)| (k.to_string(), value_to_json(v))).collect();
    Json::Object(fields)
}

/// Booleans and integers up to 32 bits map to JSON natives, floats to numbers when finite.
/// Everything else, `Int64` and `Decimal` included, is rendered as its literal string.
pub fn value_to_json(v: &Value) -> Json {
    match v {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Byte(n) => Json::from(*n),
        Value::SByte(n) => Json::from(*n),
        Value::Int16(n) => Json::from(*n),
        Value::Int32(n) => Json::from(*n),
        Value::Single(f) => Number::from_f64(*f as f64).map(Json::Number).unwrap_or_else(|| Json::String(v.to_literal())),
        Value::Double(f) => Number::from_f64(*f).map(Json::Number).unwrap_or_else(|| Json::String(v.to_literal())),
        Value::Links(keys) => Json::Array(keys.iter().map(|k| record_to_json(&k.to_record())).collect()),
        other => Json::String(other.to_literal()),
    }
}

/// Feed document in the `{"d":{"results":[..]}}` shape.
pub fn feed_to_json(records: &[Record]) -> Json {
    serde_json::json!({ "d": { "results": records.iter().map(record_to_json).collect::<Vec<_>>() } })
}

fn json_kind(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
