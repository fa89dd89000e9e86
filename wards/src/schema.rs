//! JSON Schema (draft 7) describing a valid tenant document.
//!
//! Unknown keys are allowed everywhere; `null` is accepted wherever a
//! parameter is, since it reads as unset.

use serde_json::{json, Map, Value};

use crate::fields::{number_to_json, FieldDefinition, FieldKind};
use crate::path::{ENABLED_FIELD, POLICY_ROOT};
use crate::registry::Registries;

pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

pub fn policy_schema(registries: &Registries) -> Value {
    let mut events = Map::new();
    for event in registries.catalog.events() {
        let event = event.as_str();
        let mut properties = Map::new();
        properties.insert(ENABLED_FIELD.to_string(), json!({"type": ["boolean", "null"]}));
        for def in registries.fields.fields_for(event) {
            if let Some(relative) = def.policy_path().relative_to(event) {
                insert_property(&mut properties, relative, field_schema(def));
            }
        }

        let mut node = Map::new();
        node.insert("type".into(), json!(["object", "null"]));
        if let Some(desc) = registries.descriptions.description_for(event) {
            node.insert("title".into(), Value::String(desc.title.clone()));
            node.insert("description".into(), Value::String(desc.description.clone()));
        }
        node.insert("properties".into(), Value::Object(properties));
        events.insert(event.to_string(), Value::Object(node));
    }

    json!({
        "$schema": DRAFT_07,
        "title": "Tenant automation policy",
        "type": "object",
        "properties": {
            POLICY_ROOT: {
                "type": ["object", "null"],
                "properties": events
            }
        }
    })
}

fn insert_property(properties: &mut Map<String, Value>, segments: &[String], schema: Value) {
    let Some((key, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        properties.insert(key.clone(), schema);
        return;
    }
    let group = properties
        .entry(key.clone())
        .or_insert_with(|| json!({"type": ["object", "null"], "properties": {}}));
    if let Some(Value::Object(children)) = group.get_mut("properties") {
        insert_property(children, rest, schema);
    }
}

fn field_schema(def: &FieldDefinition) -> Value {
    let mut schema = Map::new();
    schema.insert("title".into(), Value::String(def.label().to_string()));
    match def.kind() {
        FieldKind::Number { bounds, .. } => {
            schema.insert("type".into(), json!(["number", "null"]));
            if let Some(min) = bounds.min() {
                schema.insert("minimum".into(), number_to_json(min));
            }
            if let Some(max) = bounds.max() {
                schema.insert("maximum".into(), number_to_json(max));
            }
        }
        FieldKind::Text { .. } => {
            schema.insert("type".into(), json!(["string", "null"]));
        }
        FieldKind::Boolean { .. } => {
            schema.insert("type".into(), json!(["boolean", "null"]));
        }
        FieldKind::Select { options, .. } => {
            let mut allowed: Vec<Value> = options.as_slice().iter().map(|o| o.value.to_json()).collect();
            allowed.push(Value::Null);
            schema.insert("enum".into(), Value::Array(allowed));
        }
    }
    if let Some(default) = def.kind().default_value() {
        schema.insert("default".into(), default.to_json());
    }
    Value::Object(schema)
}
