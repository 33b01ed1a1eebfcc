//! JSON Schema export of declared request schemas.
//!
//! Produces a standard draft 2020-12 document for clients that want to
//! check payloads before calling the API. Shape predicates that JSON Schema
//! cannot express exactly (calendar validity, age limit, JSON integers
//! written as floats) are approximated and described; the binder stays
//! authoritative.

use serde_json::{json, Map, Value};

use crate::field::{Field, FieldKind, DATE_PATTERN, GENDERS};
use crate::schema::Schema;

const DRAFT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Export a schema as a JSON Schema object document.
pub fn to_json_schema(schema: &Schema) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for (name, field) in schema.fields {
        properties.insert((*name).to_string(), field_schema(field));
        if field.required {
            required.push(json!(name));
        }
    }

    let mut doc = Map::new();
    doc.insert("$schema".into(), json!(DRAFT));
    doc.insert("title".into(), json!(schema.name));
    doc.insert("type".into(), json!("object"));
    doc.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        doc.insert("required".into(), Value::Array(required));
    }
    if let Some(invariant) = &schema.invariant {
        doc.insert("description".into(), json!(invariant.rule));
    }
    Value::Object(doc)
}

/// JSON Schema for one field, honoring its nullable policy.
fn field_schema(field: &Field) -> Value {
    let shape = kind_schema(field.kind);
    let empty = field.kind.empty_value();

    match (field.nullable, empty) {
        // A required field rejects null as missing even when nullable.
        (true, Value::Null) if !field.required => json!({ "anyOf": [shape, { "type": "null" }] }),
        (true, Value::Null) => shape,
        (true, empty) => json!({ "anyOf": [shape, { "const": empty }] }),
        (false, _) => non_empty(shape, field.kind),
    }
}

fn non_empty(mut shape: Value, kind: FieldKind) -> Value {
    let key = match kind {
        FieldKind::Char | FieldKind::Email => "minLength",
        FieldKind::ClientIds => "minItems",
        FieldKind::Arguments => "minProperties",
        _ => return shape,
    };
    if let Value::Object(map) = &mut shape {
        map.insert(key.into(), json!(1));
    }
    shape
}

fn kind_schema(kind: FieldKind) -> Value {
    match kind {
        FieldKind::Char => json!({ "type": "string" }),
        FieldKind::Arguments => json!({ "type": "object" }),
        FieldKind::Email => json!({ "type": "string", "pattern": "@" }),
        FieldKind::Phone => json!({
            "anyOf": [
                { "type": "string", "pattern": "^7.{10}$" },
                { "type": "integer", "minimum": 70_000_000_000u64, "maximum": 79_999_999_999u64 }
            ]
        }),
        FieldKind::Date | FieldKind::BirthDay => json!({
            "type": "string",
            "pattern": DATE_PATTERN,
            "description": kind.expected(),
        }),
        FieldKind::Gender => {
            let codes: Vec<i64> = GENDERS.iter().map(|(code, _)| *code).collect();
            json!({
                "type": "integer",
                "enum": codes,
                "description": "integer 0, 1 or 2; floats such as 1.0 are rejected",
            })
        }
        FieldKind::ClientIds => json!({
            "type": "array",
            "items": { "type": "integer" },
            "description": "array of integers; floats such as 1.0 are rejected",
        }),
    }
}
