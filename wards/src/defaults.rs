//! The document written when a tenant is provisioned.

use crate::catalog::EventStatus;
use crate::merge::{apply_bulk_update, BulkUpdate, MergeError};
use crate::registry::Registries;
use crate::tree::ConfigTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Initial switch for active rules. Planned rules always start disabled.
    pub enable_active: bool,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            enable_active: true,
        }
    }
}

/// Every catalog rule gets an explicit `enabled` flag and every declared
/// default at its path, so nothing in a new tenant is left unset.
pub fn default_tree(registries: &Registries, options: ProvisionOptions) -> Result<ConfigTree, MergeError> {
    let mut tree = ConfigTree::new();
    for entry in registries.catalog.entries() {
        let event = entry.event_type.as_str();
        let fields = registries.fields.fields_for(event);
        let enabled = entry.status == EventStatus::Active && options.enable_active;

        let update = fields.iter().fold(
            BulkUpdate::new().with_enabled(enabled),
            |update, def| match def.kind().default_value() {
                Some(value) => update.with_criterion(def.field(), value.to_json()),
                None => update,
            },
        );
        tree = apply_bulk_update(&tree, event, fields, &update)?;
    }
    Ok(tree)
}
