//! Read-only view of one rule as an operator sees it.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::catalog::{CatalogError, EventStatus};
use crate::fields::FieldValue;
use crate::registry::Registries;
use crate::resolve::{legacy_path_for, resolve_field, resolve_with_legacy, LegacyAlias};
use crate::tree::ConfigTree;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamDisplay {
    Set(FieldValue),
    NotSet,
}

impl fmt::Display for ParamDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(value) => write!(f, "{value}"),
            Self::NotSet => f.write_str("not set"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSummary {
    pub field: String,
    pub label: String,
    pub value: ParamDisplay,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub event: String,
    pub title: Option<String>,
    pub category: Option<String>,
    pub status: EventStatus,
    /// `None` when the flag is unset or not a boolean.
    pub enabled: Option<bool>,
    pub params: Vec<ParamSummary>,
}

impl fmt::Display for EventSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event)?;
        if let Some(title) = &self.title {
            write!(f, " ({title})")?;
        }
        if self.status == EventStatus::Planned {
            f.write_str(" [planned]")?;
        }
        writeln!(f)?;
        let enabled = match self.enabled {
            Some(true) => "on",
            Some(false) => "off",
            None => "not set",
        };
        writeln!(f, "  enabled: {enabled}")?;
        for param in &self.params {
            writeln!(f, "  {}: {}", param.field, param.value)?;
        }
        Ok(())
    }
}

/// `legacy` is the alias list the gate consults, so both report the same
/// enabled state.
pub fn summarize(
    registries: &Registries,
    tree: &ConfigTree,
    event: &str,
    legacy: &[LegacyAlias],
) -> Result<EventSummary, CatalogError> {
    let enabled_path = registries.catalog.enabled_path(event)?;
    let status = registries.catalog.status(event).unwrap_or_default();
    let description = registries.descriptions.description_for(event);

    let params = registries
        .fields
        .fields_for(event)
        .iter()
        .map(|def| ParamSummary {
            field: def.field().to_string(),
            label: def.label().to_string(),
            value: resolve_field(tree, def).map_or(ParamDisplay::NotSet, ParamDisplay::Set),
        })
        .collect();

    Ok(EventSummary {
        event: event.to_string(),
        title: description.map(|d| d.title.clone()),
        category: description.map(|d| d.category.clone()),
        status,
        enabled: resolve_with_legacy(tree, &enabled_path, legacy_path_for(legacy, &enabled_path))
            .value()
            .and_then(Value::as_bool),
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unset_parameters_render_as_not_set() {
        let reg = Registries::builtin().unwrap();
        let tree = ConfigTree::from_value(json!({
            "auto_notification": {"payment_due_reminder": {"days_before_first": 0}}
        }))
        .unwrap();
        let summary = summarize(&reg, &tree, "payment_due_reminder", &[]).unwrap();
        assert_eq!(summary.enabled, None);
        let rendered = summary.to_string();
        assert!(rendered.contains("enabled: not set"));
        assert!(rendered.contains("days_before_first: 0"));
        assert!(rendered.contains("days_before_second: not set"));
        assert!(!rendered.contains("days_before_second: 1"));
    }

    #[test]
    fn unknown_event_is_an_error() {
        let reg = Registries::builtin().unwrap();
        assert!(summarize(&reg, &ConfigTree::new(), "nope", &[]).is_err());
    }

    #[test]
    fn legacy_enabled_flag_is_shown_when_fallback_is_on() {
        let reg = Registries::builtin().unwrap();
        let aliases = crate::builtin::legacy_aliases().unwrap();
        let tree = ConfigTree::from_value(json!({"auto_consultation_summary": {"enabled": true}})).unwrap();

        let with_fallback = summarize(&reg, &tree, "consultation_summary_ready", &aliases).unwrap();
        assert_eq!(with_fallback.enabled, Some(true));
        assert!(with_fallback.to_string().contains("enabled: on"));

        let canonical_only = summarize(&reg, &tree, "consultation_summary_ready", &[]).unwrap();
        assert_eq!(canonical_only.enabled, None);
    }

    #[test]
    fn canonical_flag_wins_over_legacy() {
        let reg = Registries::builtin().unwrap();
        let aliases = crate::builtin::legacy_aliases().unwrap();
        let tree = ConfigTree::from_value(json!({
            "auto_notification": {"attendance_pattern_anomaly": {"enabled": false}},
            "auto_message_suggestion": {"enabled": true}
        }))
        .unwrap();
        let summary = summarize(&reg, &tree, "attendance_pattern_anomaly", &aliases).unwrap();
        assert_eq!(summary.enabled, Some(false));
    }
}
