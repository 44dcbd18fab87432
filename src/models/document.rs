//! Tolerant field access for untyped stored documents.
//!
//! The store's schema has evolved over time: old documents lack newer
//! fields, and a few fields changed representation along the way
//! (timestamps in particular exist both as RFC 3339 strings and as epoch
//! milliseconds). Conversion therefore never fails: missing or malformed
//! values degrade to defaults instead.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

/// An untyped stored document: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// A document paired with its store-assigned id.
#[derive(Debug, Clone)]
pub struct StoredDoc {
    pub id: super::DocId,
    pub fields: Document,
}

impl StoredDoc {
    pub fn new(id: super::DocId, fields: Document) -> Self {
        Self { id, fields }
    }
}

/// Read a string field, defaulting to empty.
pub fn str_field(doc: &Document, field: &str) -> String {
    match doc.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Read an optional string field; empty or missing becomes `None`.
pub fn opt_str_field(doc: &Document, field: &str) -> Option<String> {
    match doc.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Read an integer field, defaulting to 0. Accepts numeric strings.
pub fn i64_field(doc: &Document, field: &str) -> i64 {
    match doc.get(field) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_else(|| {
            n.as_f64().map(|f| f as i64).unwrap_or(0)
        }),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Read an optional integer field; missing or malformed becomes `None`.
pub fn opt_i64_field(doc: &Document, field: &str) -> Option<i64> {
    match doc.get(field) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

/// Read an optional float field; missing or malformed becomes `None`.
pub fn opt_f64_field(doc: &Document, field: &str) -> Option<f64> {
    match doc.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    }
}

/// Read a boolean field, defaulting to false.
pub fn bool_field(doc: &Document, field: &str) -> bool {
    matches!(doc.get(field), Some(Value::Bool(true)))
}

/// Read a timestamp field.
///
/// Accepts RFC 3339 strings and epoch-millisecond integers; anything else
/// (including unparseable strings) becomes `None`.
pub fn datetime_field(doc: &Document, field: &str) -> Option<DateTime<Utc>> {
    match doc.get(field) {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

/// Read a string-array field, defaulting to empty. Non-string elements
/// are stringified rather than dropped.
pub fn str_array_field(doc: &Document, field: &str) -> Vec<String> {
    match doc.get(field) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Format a timestamp for storage (RFC 3339, the current representation).
pub fn datetime_value(dt: DateTime<Utc>) -> Value {
    Value::String(dt.to_rfc3339())
}
