//! The three registries bundled as one immutable value.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::builtin;
use crate::catalog::{Catalog, CatalogError};
use crate::config::ValidationMode;
use crate::descriptions::DescriptionRegistry;
use crate::fields::{FieldError, FieldSchemaRegistry};
use crate::validate::{validate, ValidationErrors};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry file {path} could not be read: {message}")]
    Io { path: String, message: String },

    #[error("registry document is malformed: {message}")]
    Json { message: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Catalog, parameter schemas and descriptions. Built once, then shared by
/// reference; nothing mutates them after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registries {
    pub catalog: Catalog,
    pub fields: FieldSchemaRegistry,
    pub descriptions: DescriptionRegistry,
}

impl Registries {
    pub fn new(catalog: Catalog, fields: FieldSchemaRegistry, descriptions: DescriptionRegistry) -> Self {
        Self {
            catalog,
            fields,
            descriptions,
        }
    }

    /// Rules shipped with the product.
    pub fn builtin() -> Result<Self, RegistryError> {
        Ok(Self {
            catalog: builtin::catalog()?,
            fields: builtin::field_schemas()?,
            descriptions: builtin::descriptions(),
        })
    }

    /// `{ "catalog": [...], "fields": {...}, "descriptions": {...} }`
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        serde_json::from_str(json).map_err(|e| RegistryError::Json {
            message: e.to_string(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, RegistryError> {
        debug!(path = %path.display(), "loading registries");
        let content = std::fs::read_to_string(path).map_err(|e| RegistryError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        validate(self)
    }

    /// Runs the consistency check. Strict mode refuses inconsistent
    /// registries; advisory mode logs each problem and keeps them.
    pub fn validated(self, mode: ValidationMode) -> Result<Self, ValidationErrors> {
        match (self.validate(), mode) {
            (Ok(()), _) => Ok(self),
            (Err(errors), ValidationMode::Strict) => Err(errors),
            (Err(errors), ValidationMode::Advisory) => {
                for error in errors.errors() {
                    warn!(%error, "registry inconsistency");
                }
                Ok(self)
            }
        }
    }
}
