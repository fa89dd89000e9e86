use tracing::{info, instrument};
use wards::{apply_bulk_update, default_tree, BulkUpdate, ConfigTree, ProvisionOptions, Registries};

use crate::store::{TenantConfigStore, WriteMode};
use crate::ConfigError;

/// How [`update_event_policy`] guards against concurrent writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    /// Whatever is stored when the write lands is overwritten.
    #[default]
    LastWriterWins,
    /// Write only if nobody replaced the document since it was fetched.
    Checked,
    /// Write only if the stored document is at this revision.
    Expect(u64),
}

/// Fetches the whole tenant document, merges `update` into `event`, and
/// replaces the whole document. Returns the new revision.
#[instrument(skip(store, registries, update))]
pub fn update_event_policy<S: TenantConfigStore + ?Sized>(
    store: &S,
    registries: &Registries,
    tenant: &str,
    event: &str,
    update: &BulkUpdate,
    concurrency: Concurrency,
) -> Result<u64, ConfigError> {
    registries.catalog.require(event)?;

    let (tree, fetched) = match store.fetch(tenant)? {
        Some(doc) => (doc.value, doc.revision),
        None => (ConfigTree::new(), 0),
    };
    let next = apply_bulk_update(&tree, event, registries.fields.fields_for(event), update)?;

    let mode = match concurrency {
        Concurrency::LastWriterWins => WriteMode::LastWriterWins,
        Concurrency::Checked => WriteMode::IfRevision(fetched),
        Concurrency::Expect(revision) => WriteMode::IfRevision(revision),
    };
    let revision = store.replace(tenant, next, mode)?;
    info!(revision, "event policy updated");
    Ok(revision)
}

/// Writes the default document for a new tenant. Existing documents are left
/// alone and `None` is returned.
#[instrument(skip(store, registries))]
pub fn provision_tenant<S: TenantConfigStore + ?Sized>(
    store: &S,
    registries: &Registries,
    tenant: &str,
    options: ProvisionOptions,
) -> Result<Option<u64>, ConfigError> {
    if store.fetch(tenant)?.is_some() {
        info!("tenant already provisioned");
        return Ok(None);
    }
    let tree = default_tree(registries, options)?;
    let revision = store.replace(tenant, tree, WriteMode::IfRevision(0))?;
    info!(revision, "tenant provisioned");
    Ok(Some(revision))
}
