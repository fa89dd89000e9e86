//! The per-tenant configuration document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::path::PolicyPath;
use crate::resolve::json_type;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("configuration root must be an object, found {found}")]
    NotAnObject { found: &'static str },
}

/// Nested JSON object holding every enabled flag and parameter of a tenant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree(Map<String, Value>);

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// `null` reads as an empty document; any other non-object root is refused.
    pub fn from_value(value: Value) -> Result<Self, TreeError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(TreeError::NotAnObject {
                found: json_type(&other),
            }),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the document with `value` written at `path`. Missing
    /// intermediate objects are created; keys off the path are untouched.
    pub fn with_value(mut self, path: &PolicyPath, value: Value) -> Self {
        write_at(&mut self.0, path.segments(), value, path);
        self
    }
}

fn write_at(map: &mut Map<String, Value>, segments: &[String], value: Value, path: &PolicyPath) {
    let Some((key, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.insert(key.clone(), value);
        return;
    }
    let node = map
        .entry(key.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if !node.is_object() {
        warn!(
            path = %path,
            key = %key,
            found = json_type(node),
            "replacing non-object node on write path"
        );
        *node = Value::Object(Map::new());
    }
    if let Value::Object(child) = node {
        write_at(child, rest, value, path);
    }
}

impl TryFrom<Value> for ConfigTree {
    type Error = TreeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<ConfigTree> for Value {
    fn from(tree: ConfigTree) -> Self {
        tree.into_value()
    }
}
