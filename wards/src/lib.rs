//! Tenant-scoped automation policy engine.
//!
//! A rule runs only when its tenant document explicitly enables it. The
//! registries (catalog, parameter schemas, descriptions) are plain values
//! checked against each other at load; reads never coerce and writes never
//! drop sibling keys.

pub mod builtin;
pub mod catalog;
pub mod config;
pub mod defaults;
pub mod descriptions;
pub mod fields;
pub mod gate;
pub mod merge;
pub mod path;
pub mod registry;
pub mod resolve;
pub mod schema;
pub mod summary;
pub mod tree;
pub mod validate;

pub use catalog::{Catalog, CatalogEntry, CatalogError, EventStatus, EventType};
pub use config::{load_from_env, ValidationMode, WardsConfig};
pub use defaults::{default_tree, ProvisionOptions};
pub use descriptions::{Category, DescriptionRegistry, EventDescription};
pub use fields::{FieldDefinition, FieldError, FieldKind, FieldSchemaRegistry, FieldValue, OptionValue, SelectOption};
pub use gate::{GateDecision, GateReason, PolicyGate};
pub use merge::{apply_bulk_update, apply_field_update, BulkUpdate, MergeError};
pub use path::{PathError, PolicyPath};
pub use registry::{Registries, RegistryError};
pub use resolve::{
    legacy_path_for, resolve, resolve_field, resolve_typed, resolve_with_legacy, LegacyAlias, Resolved, Unresolved,
};
pub use schema::policy_schema;
pub use summary::{summarize, EventSummary, ParamDisplay};
pub use tree::{ConfigTree, TreeError};
pub use validate::{validate, ConsistencyError, ValidationErrors};
