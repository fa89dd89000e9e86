use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};
use wards::{policy_schema, CatalogError, ConfigTree, MergeError, Registries};

pub mod store;
pub mod update;

pub use store::{
    validate_tenant_id, FileConfigStore, MemoryConfigStore, StoreError, StoredConfig, TenantConfigStore, WriteMode,
    CONFIG_KEY,
};
pub use update::{provision_tenant, update_event_policy, Concurrency};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Schema compilation failed: {message}")]
    SchemaCompilationFailed { message: String },

    #[error("Config validation failed")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub json_pointer: String,
    pub message: String,
    pub schema_path: String,
}

/// Audits tenant documents against the schema derived from the registries.
///
/// The gate already ignores values of the wrong type; the audit is how an
/// operator finds them.
pub struct ConfigManager {
    schema: JSONSchema,
    document: Value,
}

impl ConfigManager {
    #[instrument(skip(registries))]
    pub fn new(registries: &Registries) -> Result<Self, ConfigError> {
        let document = policy_schema(registries);
        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&document)
            .map_err(|e| ConfigError::SchemaCompilationFailed {
                message: e.to_string(),
            })?;
        debug!("Compiled policy schema for {} events", registries.catalog.len());
        Ok(Self { schema, document })
    }

    /// The draft-07 schema this manager validates against.
    pub fn schema_document(&self) -> &Value {
        &self.document
    }

    /// Every schema violation in `tree`; empty when the document is clean.
    pub fn audit(&self, tree: &ConfigTree) -> Vec<ValidationError> {
        let instance = Value::Object(tree.as_map().clone());
        let result = self.schema.validate(&instance);
        match result {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|error| ValidationError {
                    json_pointer: error.instance_path.to_string(),
                    message: error.to_string(),
                    schema_path: error.schema_path.to_string(),
                })
                .collect(),
        }
    }

    pub fn validate(&self, tree: &ConfigTree) -> Result<(), ConfigError> {
        let errors = self.audit(tree);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed { errors })
        }
    }
}
