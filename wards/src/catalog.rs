//! Closed set of automation rule identifiers.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::path::{PathError, PolicyPath};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(String);

impl EventType {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for EventType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventType {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rollout state of a rule. Planned rules are listed but marked as upcoming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Active,
    Planned,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Planned => f.write_str("planned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub event_type: EventType,
    #[serde(default)]
    pub status: EventStatus,
}

impl CatalogEntry {
    pub fn active(id: &str) -> Self {
        Self {
            event_type: EventType::from(id),
            status: EventStatus::Active,
        }
    }

    pub fn planned(id: &str) -> Self {
        Self {
            event_type: EventType::from(id),
            status: EventStatus::Planned,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("invalid automation event type id '{id}'")]
    InvalidId { id: String },

    #[error("automation event type '{id}' is listed twice")]
    Duplicate { id: String },

    #[error("unknown automation event type '{id}'")]
    UnknownEventType { id: String },

    #[error("field name '{field}' must be a single key")]
    InvalidField { field: String },

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Ordered, immutable list of valid rule ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CatalogEntry>", into = "Vec<CatalogEntry>")]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<EventType, usize>,
}

impl Catalog {
    pub fn new(entries: impl IntoIterator<Item = CatalogEntry>) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for entry in entries {
            let id = entry.event_type.as_str();
            if id.is_empty() || id.contains('.') || id.chars().any(char::is_whitespace) {
                return Err(CatalogError::InvalidId { id: id.to_string() });
            }
            if catalog.index.contains_key(id) {
                return Err(CatalogError::Duplicate { id: id.to_string() });
            }
            catalog
                .index
                .insert(entry.event_type.clone(), catalog.entries.len());
            catalog.entries.push(entry);
        }
        Ok(catalog)
    }

    /// Catalog where every id is active.
    pub fn from_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Result<Self, CatalogError> {
        Self::new(ids.into_iter().map(CatalogEntry::active))
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn events(&self) -> impl Iterator<Item = &EventType> + '_ {
        self.entries.iter().map(|entry| &entry.event_type)
    }

    pub fn active_events(&self) -> impl Iterator<Item = &EventType> + '_ {
        self.entries
            .iter()
            .filter(|entry| entry.status == EventStatus::Active)
            .map(|entry| &entry.event_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_valid_event_type(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn status(&self, id: &str) -> Option<EventStatus> {
        self.index.get(id).map(|&idx| self.entries[idx].status)
    }

    /// Fail-closed membership assertion for ids coming from outside the engine.
    pub fn require(&self, id: &str) -> Result<&EventType, CatalogError> {
        self.index
            .get(id)
            .map(|&idx| &self.entries[idx].event_type)
            .ok_or_else(|| CatalogError::UnknownEventType { id: id.to_string() })
    }

    /// Path of `field` under a catalog rule. Unknown ids are refused.
    pub fn policy_path(&self, id: &str, field: &str) -> Result<PolicyPath, CatalogError> {
        if field.contains('.') {
            return Err(CatalogError::InvalidField {
                field: field.to_string(),
            });
        }
        self.nested_policy_path(id, field)
    }

    /// Like [`Catalog::policy_path`] but `nested` may span groups (`throttle.daily_limit`).
    pub fn nested_policy_path(&self, id: &str, nested: &str) -> Result<PolicyPath, CatalogError> {
        let event = self.require(id)?;
        Ok(PolicyPath::for_event(event.as_str(), nested)?)
    }

    pub fn enabled_path(&self, id: &str) -> Result<PolicyPath, CatalogError> {
        let event = self.require(id)?;
        Ok(PolicyPath::enabled(event.as_str())?)
    }
}

impl TryFrom<Vec<CatalogEntry>> for Catalog {
    type Error = CatalogError;

    fn try_from(entries: Vec<CatalogEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<Catalog> for Vec<CatalogEntry> {
    fn from(catalog: Catalog) -> Self {
        catalog.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_and_order_follow_declaration() {
        let catalog = Catalog::new([
            CatalogEntry::active("payment_due_reminder"),
            CatalogEntry::planned("birthday_greeting"),
            CatalogEntry::active("refund_spike"),
        ])
        .unwrap();

        let ids: Vec<&str> = catalog.events().map(EventType::as_str).collect();
        assert_eq!(
            ids,
            ["payment_due_reminder", "birthday_greeting", "refund_spike"]
        );
        let active: Vec<&str> = catalog.active_events().map(EventType::as_str).collect();
        assert_eq!(active, ["payment_due_reminder", "refund_spike"]);
        assert!(catalog.is_valid_event_type("refund_spike"));
        assert!(!catalog.is_valid_event_type("refund"));
        assert_eq!(
            catalog.status("birthday_greeting"),
            Some(EventStatus::Planned)
        );
    }

    #[test]
    fn duplicates_and_dotted_ids_are_rejected() {
        assert_eq!(
            Catalog::from_ids(["a", "a"]),
            Err(CatalogError::Duplicate { id: "a".into() })
        );
        assert!(matches!(
            Catalog::from_ids(["payment.due"]),
            Err(CatalogError::InvalidId { .. })
        ));
        assert!(matches!(
            Catalog::from_ids([""]),
            Err(CatalogError::InvalidId { .. })
        ));
    }

    #[test]
    fn paths_are_only_built_for_members() {
        let catalog = Catalog::from_ids(["refund_spike"]).unwrap();
        assert_eq!(
            catalog.enabled_path("refund_spike").unwrap().as_str(),
            "auto_notification.refund_spike.enabled"
        );
        assert!(matches!(
            catalog.policy_path("not_a_rule", "threshold"),
            Err(CatalogError::UnknownEventType { .. })
        ));
        assert!(matches!(
            catalog.policy_path("refund_spike", "throttle.daily_limit"),
            Err(CatalogError::InvalidField { .. })
        ));
        assert_eq!(
            catalog
                .nested_policy_path("refund_spike", "throttle.daily_limit")
                .unwrap()
                .segments()
                .len(),
            4
        );
    }

    #[test]
    fn deserializes_with_default_status() {
        let catalog: Catalog = serde_json::from_str(
            r#"[{"event_type":"refund_spike"},{"event_type":"birthday_greeting","status":"planned"}]"#,
        )
        .unwrap();
        assert_eq!(catalog.status("refund_spike"), Some(EventStatus::Active));
        assert_eq!(
            catalog.status("birthday_greeting"),
            Some(EventStatus::Planned)
        );
        assert!(serde_json::from_str::<Catalog>(r#"[{"event_type":"x"},{"event_type":"x"}]"#)
            .is_err());
    }
}
