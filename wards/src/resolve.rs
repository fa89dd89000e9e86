//! Fail-closed lookup of values inside a tenant document.
//!
//! Nothing here coerces: a stored `"true"` is a string, not a boolean, and a
//! JSON `null` is the same as an absent key. Callers that gate actions must
//! treat anything other than a typed hit as "do not act".

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::fields::{FieldDefinition, FieldValue};
use crate::path::PolicyPath;
use crate::tree::ConfigTree;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    Found(&'a Value),
    Missing,
}

impl<'a> Resolved<'a> {
    pub fn value(self) -> Option<&'a Value> {
        match self {
            Self::Found(v) => Some(v),
            Self::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Only a stored boolean `true` counts.
    pub fn is_true(&self) -> bool {
        matches!(self, Self::Found(Value::Bool(true)))
    }
}

pub fn resolve<'a>(tree: &'a ConfigTree, path: &PolicyPath) -> Resolved<'a> {
    resolve_segments(tree, path.segments())
}

pub fn resolve_segments<'a>(tree: &'a ConfigTree, segments: &[String]) -> Resolved<'a> {
    let Some((first, rest)) = segments.split_first() else {
        return Resolved::Missing;
    };
    let mut node = match tree.as_map().get(first) {
        Some(v) => v,
        None => return Resolved::Missing,
    };
    for key in rest {
        node = match node.as_object().and_then(|map| map.get(key)) {
            Some(v) => v,
            None => return Resolved::Missing,
        };
    }
    if node.is_null() {
        Resolved::Missing
    } else {
        Resolved::Found(node)
    }
}

/// Types a stored value can be read as without conversion.
pub trait PolicyValue: Sized {
    const KIND: &'static str;
    fn from_policy(value: &Value) -> Option<Self>;
}

impl PolicyValue for bool {
    const KIND: &'static str = "boolean";
    fn from_policy(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl PolicyValue for f64 {
    const KIND: &'static str = "number";
    fn from_policy(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl PolicyValue for i64 {
    const KIND: &'static str = "integer";
    fn from_policy(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl PolicyValue for u64 {
    const KIND: &'static str = "unsigned integer";
    fn from_policy(value: &Value) -> Option<Self> {
        value.as_u64()
    }
}

impl PolicyValue for String {
    const KIND: &'static str = "string";
    fn from_policy(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

pub fn resolve_typed<T: PolicyValue>(tree: &ConfigTree, path: &PolicyPath) -> Option<T> {
    let value = resolve(tree, path).value()?;
    let typed = T::from_policy(value);
    if typed.is_none() {
        debug!(
            path = %path,
            expected = T::KIND,
            found = json_type(value),
            "policy value has unexpected type"
        );
    }
    typed
}

pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    #[error("no value stored")]
    Missing,

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Read a parameter through its field's guard. A select value outside the
/// declared options is a mismatch.
pub fn resolve_field(tree: &ConfigTree, def: &FieldDefinition) -> Result<FieldValue, Unresolved> {
    let value = resolve(tree, def.policy_path())
        .value()
        .ok_or(Unresolved::Missing)?;
    def.kind().guard(value).ok_or_else(|| {
        debug!(
            path = %def.policy_path(),
            expected = def.kind().name(),
            found = json_type(value),
            "parameter failed its type guard"
        );
        Unresolved::TypeMismatch {
            expected: def.kind().name(),
            found: json_type(value),
        }
    })
}

/// Read-only mapping from a path that older documents used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyAlias {
    pub canonical: PolicyPath,
    pub legacy: PolicyPath,
}

impl LegacyAlias {
    pub fn new(canonical: PolicyPath, legacy: PolicyPath) -> Self {
        Self { canonical, legacy }
    }
}

/// Legacy path registered for `canonical`, if any.
pub fn legacy_path_for<'a>(aliases: &'a [LegacyAlias], canonical: &PolicyPath) -> Option<&'a PolicyPath> {
    aliases
        .iter()
        .find(|alias| &alias.canonical == canonical)
        .map(|alias| &alias.legacy)
}

/// Canonical path first; the legacy path is consulted only when the
/// canonical one is missing.
pub fn resolve_with_legacy<'a>(
    tree: &'a ConfigTree,
    path: &PolicyPath,
    legacy: Option<&PolicyPath>,
) -> Resolved<'a> {
    let canonical = resolve(tree, path);
    if !canonical.is_missing() {
        return canonical;
    }
    let Some(legacy) = legacy else {
        return Resolved::Missing;
    };
    let fallback = resolve(tree, legacy);
    if !fallback.is_missing() {
        warn!(
            canonical = %path,
            legacy = %legacy,
            "policy read from legacy path; rewrite the document to migrate"
        );
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> ConfigTree {
        ConfigTree::from_value(value).unwrap()
    }

    fn path(raw: &str) -> PolicyPath {
        PolicyPath::parse(raw).unwrap()
    }

    #[test]
    fn null_and_scalar_intermediates_are_missing() {
        let doc = tree(json!({"a": {"b": null, "c": 5}}));
        assert!(resolve(&doc, &path("a.b")).is_missing());
        assert!(resolve(&doc, &path("a.c.d")).is_missing());
        assert_eq!(resolve(&doc, &path("a.c")), Resolved::Found(&json!(5)));
    }

    #[test]
    fn typed_reads_do_not_coerce() {
        let doc = tree(json!({"a": {"flag": "true", "n": 3}}));
        assert_eq!(resolve_typed::<bool>(&doc, &path("a.flag")), None);
        assert_eq!(resolve_typed::<String>(&doc, &path("a.flag")), Some("true".into()));
        assert_eq!(resolve_typed::<i64>(&doc, &path("a.n")), Some(3));
        assert_eq!(resolve_typed::<f64>(&doc, &path("a.n")), Some(3.0));
    }

    #[test]
    fn legacy_path_is_consulted_only_when_canonical_missing() {
        let canonical = path("auto_notification.consultation_summary_ready.enabled");
        let legacy = path("auto_consultation_summary.enabled");

        let old = tree(json!({"auto_consultation_summary": {"enabled": true}}));
        assert!(resolve_with_legacy(&old, &canonical, Some(&legacy)).is_true());
        assert!(resolve(&old, &canonical).is_missing());

        let both = tree(json!({
            "auto_consultation_summary": {"enabled": true},
            "auto_notification": {"consultation_summary_ready": {"enabled": false}}
        }));
        assert_eq!(
            resolve_with_legacy(&both, &canonical, Some(&legacy)),
            Resolved::Found(&json!(false))
        );
    }
}
