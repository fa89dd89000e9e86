//! Non-destructive writes into a tenant document.
//!
//! Every function borrows the current document and returns a new one; the
//! input is never modified. Siblings of a written key survive at every level.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::fields::{FieldDefinition, FieldKind};
use crate::path::{PathError, PolicyPath};
use crate::tree::ConfigTree;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    #[error("event id '{event}' must be a single non-empty key")]
    InvalidEvent { event: String },

    #[error("'{field}' is not a parameter of {event}")]
    UnknownField { event: String, field: String },

    #[error("{event}.{field} expects a {expected} value")]
    TypeMismatch {
        event: String,
        field: String,
        expected: &'static str,
    },

    #[error("{event}.{field} value {value} is outside its bounds")]
    OutOfRange {
        event: String,
        field: String,
        value: f64,
    },

    #[error("path '{path}' does not belong to {event}")]
    ForeignPath { event: String, path: String },
}

/// Writes one value at `auto_notification.<event>.<field>`. `field` may be
/// a grouped path such as `throttle.daily_limit`.
pub fn apply_field_update(
    tree: &ConfigTree,
    event: &str,
    field: &str,
    value: Value,
) -> Result<ConfigTree, MergeError> {
    check_event(event)?;
    let path = PolicyPath::for_event(event, field)?;
    Ok(tree.clone().with_value(&path, value))
}

/// Settings form submission: the on/off switch plus parameter values keyed
/// by field name. `null` parameters mean "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub criteria: BTreeMap<String, Value>,
}

impl BulkUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_criterion(mut self, field: &str, value: Value) -> Self {
        self.criteria.insert(field.to_string(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.criteria.values().all(Value::is_null)
    }
}

/// Applies a whole [`BulkUpdate`]. Every entry is checked against `fields`
/// before the first write, so a rejected update leaves nothing behind.
pub fn apply_bulk_update(
    tree: &ConfigTree,
    event: &str,
    fields: &[FieldDefinition],
    update: &BulkUpdate,
) -> Result<ConfigTree, MergeError> {
    check_event(event)?;

    let mut writes: Vec<(PolicyPath, Value)> = Vec::with_capacity(update.criteria.len() + 1);
    if let Some(enabled) = update.enabled {
        writes.push((PolicyPath::enabled(event)?, Value::Bool(enabled)));
    }
    for (key, value) in &update.criteria {
        if value.is_null() {
            continue;
        }
        let def = fields
            .iter()
            .find(|def| def.field() == key)
            .ok_or_else(|| MergeError::UnknownField {
                event: event.to_string(),
                field: key.clone(),
            })?;
        check_value(event, def, value)?;
        writes.push((def.policy_path().clone(), value.clone()));
    }

    Ok(writes
        .into_iter()
        .fold(tree.clone(), |acc, (path, value)| acc.with_value(&path, value)))
}

fn check_event(event: &str) -> Result<(), MergeError> {
    if event.is_empty() || event.contains('.') {
        return Err(MergeError::InvalidEvent {
            event: event.to_string(),
        });
    }
    Ok(())
}

fn check_value(event: &str, def: &FieldDefinition, value: &Value) -> Result<(), MergeError> {
    if def.policy_path().relative_to(event).is_none() {
        return Err(MergeError::ForeignPath {
            event: event.to_string(),
            path: def.policy_path().to_string(),
        });
    }
    if def.kind().guard(value).is_none() {
        return Err(MergeError::TypeMismatch {
            event: event.to_string(),
            field: def.field().to_string(),
            expected: def.kind().name(),
        });
    }
    if let (FieldKind::Number { bounds, .. }, Some(n)) = (def.kind(), value.as_f64()) {
        if !bounds.contains(n) {
            return Err(MergeError::OutOfRange {
                event: event.to_string(),
                field: def.field().to_string(),
                value: n,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{OptionValue, SelectOption};
    use serde_json::json;

    const EVENT: &str = "payment_due_reminder";

    fn fields() -> Vec<FieldDefinition> {
        vec![
            FieldDefinition::new(
                EVENT,
                "channel",
                "Channel",
                FieldKind::select(
                    vec![
                        SelectOption::new(OptionValue::text("sms"), "SMS"),
                        SelectOption::new(OptionValue::text("kakao_at"), "Kakao AlimTalk"),
                    ],
                    Some(OptionValue::text("kakao_at")),
                )
                .unwrap(),
            )
            .unwrap(),
            FieldDefinition::new(
                EVENT,
                "days_before_first",
                "First reminder",
                FieldKind::number(Some(1.0), None, Some(3.0)).unwrap(),
            )
            .unwrap(),
        ]
    }

    #[test]
    fn input_document_is_left_untouched() {
        let before = ConfigTree::from_value(json!({"auto_notification": {}})).unwrap();
        let snapshot = before.clone();
        let after = apply_field_update(&before, EVENT, "days_before_first", json!(5)).unwrap();
        assert_eq!(before, snapshot);
        assert_ne!(before, after);
    }

    #[test]
    fn empty_event_is_rejected() {
        assert!(matches!(
            apply_field_update(&ConfigTree::new(), "", "enabled", json!(true)),
            Err(MergeError::InvalidEvent { .. })
        ));
        assert!(matches!(
            apply_field_update(&ConfigTree::new(), EVENT, "throttle..limit", json!(1)),
            Err(MergeError::InvalidPath(_))
        ));
    }

    #[test]
    fn bulk_update_is_all_or_nothing() {
        let tree = ConfigTree::new();
        let update = BulkUpdate::new()
            .with_enabled(true)
            .with_criterion("channel", json!("sms"))
            .with_criterion("days_before_first", json!(0));
        let err = apply_bulk_update(&tree, EVENT, &fields(), &update).unwrap_err();
        assert!(matches!(err, MergeError::OutOfRange { .. }));

        let unknown = BulkUpdate::new().with_criterion("days_after", json!(2));
        assert!(matches!(
            apply_bulk_update(&tree, EVENT, &fields(), &unknown),
            Err(MergeError::UnknownField { .. })
        ));

        let bad_option = BulkUpdate::new().with_criterion("channel", json!("email"));
        assert!(matches!(
            apply_bulk_update(&tree, EVENT, &fields(), &bad_option),
            Err(MergeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn null_criteria_are_skipped() {
        let tree = ConfigTree::from_value(json!({
            "auto_notification": {EVENT: {"channel": "sms"}}
        }))
        .unwrap();
        let update = BulkUpdate::new()
            .with_criterion("channel", Value::Null)
            .with_criterion("days_before_first", json!(4));
        assert!(!update.is_empty());
        let out = apply_bulk_update(&tree, EVENT, &fields(), &update).unwrap();
        assert_eq!(
            out.into_value(),
            json!({"auto_notification": {EVENT: {"channel": "sms", "days_before_first": 4}}})
        );
    }
}
