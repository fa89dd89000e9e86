//! Cross-registry consistency checks, run once when registries are loaded.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::registry::Registries;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error("{event}: no field schema entry")]
    MissingFieldSchema { event: String },

    #[error("{event}: no description entry")]
    MissingDescription { event: String },

    #[error("{event}: field schema entry for an event outside the catalog")]
    OrphanFieldSchema { event: String },

    #[error("{event}: description for an event outside the catalog")]
    OrphanDescription { event: String },

    #[error("{event}.{field}: policy path '{path}' is not under auto_notification.{event}")]
    ForeignPolicyPath {
        event: String,
        field: String,
        path: String,
    },

    #[error("{event}.{field}: field declared more than once")]
    DuplicateField { event: String, field: String },

    #[error("{event}: unknown category '{category}'")]
    UnknownCategory { event: String, category: String },

    #[error("{event}.{field}: default value violates its own constraints")]
    InvalidDefault { event: String, field: String },
}

/// Every inconsistency found in one pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} registry inconsistencies found", .0.len())]
pub struct ValidationErrors(Vec<ConsistencyError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[ConsistencyError] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<ConsistencyError> {
        self.0
    }

    /// Multi-line report, one error per line.
    pub fn report(&self) -> Report<'_> {
        Report(self)
    }
}

pub struct Report<'a>(&'a ValidationErrors);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.0)?;
        for err in self.0.errors() {
            writeln!(f, "  - {err}")?;
        }
        Ok(())
    }
}

pub fn validate(registries: &Registries) -> Result<(), ValidationErrors> {
    let catalog = &registries.catalog;
    let fields = &registries.fields;
    let descriptions = &registries.descriptions;
    let mut errors = Vec::new();

    for event in catalog.events() {
        let event = event.as_str();
        if !fields.contains(event) {
            errors.push(ConsistencyError::MissingFieldSchema {
                event: event.to_string(),
            });
        }
        if !descriptions.contains(event) {
            errors.push(ConsistencyError::MissingDescription {
                event: event.to_string(),
            });
        }
    }

    for (event, defs) in fields.iter() {
        let event = event.as_str();
        if !catalog.is_valid_event_type(event) {
            errors.push(ConsistencyError::OrphanFieldSchema {
                event: event.to_string(),
            });
        }
        let mut seen = HashSet::new();
        for def in defs {
            if !seen.insert(def.field()) {
                errors.push(ConsistencyError::DuplicateField {
                    event: event.to_string(),
                    field: def.field().to_string(),
                });
            }
            if def.policy_path().relative_to(event).is_none() {
                errors.push(ConsistencyError::ForeignPolicyPath {
                    event: event.to_string(),
                    field: def.field().to_string(),
                    path: def.policy_path().to_string(),
                });
            }
            if !def.kind().default_is_consistent() {
                errors.push(ConsistencyError::InvalidDefault {
                    event: event.to_string(),
                    field: def.field().to_string(),
                });
            }
        }
    }

    for (event, desc) in descriptions.events() {
        if !catalog.is_valid_event_type(event.as_str()) {
            errors.push(ConsistencyError::OrphanDescription {
                event: event.to_string(),
            });
        }
        if descriptions.category(&desc.category).is_none() {
            errors.push(ConsistencyError::UnknownCategory {
                event: event.to_string(),
                category: desc.category.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}
