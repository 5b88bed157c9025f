//! Builds the `schema` object the `schema-on-demand` query parameter asks
//! for, and applies the documented state table to decide whether `data`
//! and/or `schema` end up in a response body.

use serde_json::{json, Value};

use cellar_engine::CollectionDef;

use crate::http::query_string::SchemaMode;

pub fn collection_schema(def: &CollectionDef) -> Value {
    json!({
        "name": def.name,
        "columns": def.columns.iter().map(|c| json!({
            "name": c.name,
            "type": c.column_type.to_string(),
            "nullable": c.nullable,
            "unique": c.unique,
            "default_value": c.default_value,
        })).collect::<Vec<_>>(),
    })
}

/// Assembles a response body out of `data` and, per `mode`, the collection's
/// schema — `only` omits `data`, `false` or absent omits `schema`, anything
/// else (including the empty/`true` forms) includes both.
pub fn envelope(mode: SchemaMode, data: Value, def: &CollectionDef) -> Value {
    match mode {
        SchemaMode::Absent | SchemaMode::DataOnly => data,
        SchemaMode::Only => json!({ "schema": collection_schema(def) }),
        SchemaMode::Both => {
            let mut body = data;
            if let Value::Object(map) = &mut body {
                map.insert("schema".to_string(), collection_schema(def));
            } else {
                body = json!({ "data": body, "schema": collection_schema(def) });
            }
            body
        }
    }
}
