//! Run-or-skip decision for one automation rule.
//!
//! An action runs only when `auto_notification.<event>.enabled` holds the
//! boolean `true`. Every other outcome, including an unknown event id, skips.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::fields::FieldValue;
use crate::registry::Registries;
use crate::resolve::{legacy_path_for, resolve_field, resolve_with_legacy, LegacyAlias, Resolved};
use crate::tree::ConfigTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateReason {
    Enabled,
    Disabled,
    Missing,
    TypeMismatch,
    UnknownEventType,
}

impl fmt::Display for GateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Missing => "no policy stored",
            Self::TypeMismatch => "enabled flag is not a boolean",
            Self::UnknownEventType => "unknown event type",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateDecision {
    pub event: String,
    pub allowed: bool,
    pub reason: GateReason,
}

impl GateDecision {
    fn deny(event: &str, reason: GateReason) -> Self {
        Self {
            event: event.to_string(),
            allowed: false,
            reason,
        }
    }
}

pub struct PolicyGate<'r> {
    registries: &'r Registries,
    legacy: Vec<LegacyAlias>,
}

impl<'r> PolicyGate<'r> {
    pub fn new(registries: &'r Registries) -> Self {
        Self {
            registries,
            legacy: Vec::new(),
        }
    }

    /// Consult these aliases when the canonical enabled path is unset.
    pub fn with_legacy_aliases(mut self, aliases: Vec<LegacyAlias>) -> Self {
        self.legacy = aliases;
        self
    }

    pub fn evaluate(&self, tree: &ConfigTree, event: &str) -> GateDecision {
        let Ok(path) = self.registries.catalog.enabled_path(event) else {
            debug!(event, "gate refused unknown event type");
            return GateDecision::deny(event, GateReason::UnknownEventType);
        };
        let legacy = legacy_path_for(&self.legacy, &path);
        let decision = match resolve_with_legacy(tree, &path, legacy) {
            Resolved::Found(Value::Bool(true)) => GateDecision {
                event: event.to_string(),
                allowed: true,
                reason: GateReason::Enabled,
            },
            Resolved::Found(Value::Bool(false)) => GateDecision::deny(event, GateReason::Disabled),
            Resolved::Found(_) => GateDecision::deny(event, GateReason::TypeMismatch),
            Resolved::Missing => GateDecision::deny(event, GateReason::Missing),
        };
        debug!(event, allowed = decision.allowed, reason = %decision.reason, "gate evaluated");
        decision
    }

    /// Typed parameter of a rule; `None` for unknown rules or fields, unset
    /// values and values failing the field's guard. Legacy aliases cover
    /// enabled flags only; parameters are read from their canonical path.
    pub fn parameter(&self, tree: &ConfigTree, event: &str, field: &str) -> Option<FieldValue> {
        if !self.registries.catalog.is_valid_event_type(event) {
            return None;
        }
        let def = self.registries.fields.field(event, field)?;
        resolve_field(tree, def).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::descriptions::DescriptionRegistry;
    use crate::fields::{FieldDefinition, FieldKind, FieldSchemaRegistry};
    use crate::path::PolicyPath;
    use serde_json::json;

    fn registries() -> Registries {
        let mut fields = FieldSchemaRegistry::new();
        fields.insert(
            "refund_spike",
            vec![FieldDefinition::new(
                "refund_spike",
                "threshold",
                "Threshold",
                FieldKind::number(Some(1.0), None, Some(2.0)).unwrap(),
            )
            .unwrap()],
        );
        fields.insert("consultation_summary_ready", Vec::new());
        Registries::new(
            Catalog::from_ids(["refund_spike", "consultation_summary_ready"]).unwrap(),
            fields,
            DescriptionRegistry::default(),
        )
    }

    fn tree(value: Value) -> ConfigTree {
        ConfigTree::from_value(value).unwrap()
    }

    #[test]
    fn only_boolean_true_allows() {
        let reg = registries();
        let gate = PolicyGate::new(&reg);
        let cases = [
            (json!({"auto_notification": {"refund_spike": {"enabled": true}}}), true, GateReason::Enabled),
            (json!({"auto_notification": {"refund_spike": {"enabled": false}}}), false, GateReason::Disabled),
            (json!({"auto_notification": {"refund_spike": {"enabled": "true"}}}), false, GateReason::TypeMismatch),
            (json!({"auto_notification": {"refund_spike": {"enabled": null}}}), false, GateReason::Missing),
            (json!({}), false, GateReason::Missing),
        ];
        for (doc, allowed, reason) in cases {
            let decision = gate.evaluate(&tree(doc), "refund_spike");
            assert_eq!(decision.allowed, allowed);
            assert_eq!(decision.reason, reason);
        }
    }

    #[test]
    fn unknown_events_are_skipped_even_when_enabled() {
        let reg = registries();
        let doc = tree(json!({"auto_notification": {"not_a_rule": {"enabled": true}}}));
        let decision = PolicyGate::new(&reg).evaluate(&doc, "not_a_rule");
        assert!(!decision.allowed);
        assert_eq!(decision.reason, GateReason::UnknownEventType);
    }

    #[test]
    fn legacy_alias_applies_only_when_configured() {
        let reg = registries();
        let doc = tree(json!({"auto_consultation_summary": {"enabled": true}}));
        let alias = LegacyAlias::new(
            PolicyPath::enabled("consultation_summary_ready").unwrap(),
            PolicyPath::parse("auto_consultation_summary.enabled").unwrap(),
        );
        assert!(!PolicyGate::new(&reg).evaluate(&doc, "consultation_summary_ready").allowed);
        assert!(
            PolicyGate::new(&reg)
                .with_legacy_aliases(vec![alias])
                .evaluate(&doc, "consultation_summary_ready")
                .allowed
        );
    }

    #[test]
    fn parameters_are_read_through_their_guard() {
        let reg = registries();
        let gate = PolicyGate::new(&reg);
        let doc = tree(json!({"auto_notification": {"refund_spike": {"threshold": 3}}}));
        assert_eq!(gate.parameter(&doc, "refund_spike", "threshold"), Some(FieldValue::Number(3.0)));
        assert_eq!(gate.parameter(&doc, "refund_spike", "window"), None);

        let text = tree(json!({"auto_notification": {"refund_spike": {"threshold": "3"}}}));
        assert_eq!(gate.parameter(&text, "refund_spike", "threshold"), None);
    }

    #[test]
    fn legacy_aliases_cover_enabled_flags_only() {
        let reg = Registries::builtin().unwrap();
        let gate = PolicyGate::new(&reg).with_legacy_aliases(crate::builtin::legacy_aliases().unwrap());
        let doc = tree(json!({"auto_consultation_summary": {"enabled": true, "min_length": 30}}));
        assert!(gate.evaluate(&doc, "consultation_summary_ready").allowed);
        assert_eq!(gate.parameter(&doc, "consultation_summary_ready", "min_length"), None);
    }
}
