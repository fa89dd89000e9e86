use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};
use wards::ConfigTree;

/// Key of the per-tenant document holding every automation policy.
pub const CONFIG_KEY: &str = "config";

pub const STORE_DIR_VAR: &str = "POLICY_STORE_DIR";
pub const DEFAULT_STORE_DIR: &str = ".policy/tenants";

static TENANT_ID: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").ok());

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid tenant id: {tenant}")]
    InvalidTenant { tenant: String },

    #[error("Failed to read tenant config: {message}")]
    FileReadError { message: String },

    #[error("Failed to write tenant config: {message}")]
    FileWriteError { message: String },

    #[error("Invalid JSON format: {message}")]
    JsonError { message: String },

    #[error("Tenant {tenant} config is at revision {found}, expected {expected}")]
    RevisionConflict {
        tenant: String,
        expected: u64,
        found: u64,
    },

    #[error("Tenant config store lock poisoned")]
    Poisoned,
}

/// One tenant document as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredConfig {
    pub tenant: String,
    pub key: String,
    /// Starts at 1 and increases on every replace. An absent document is revision 0.
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
    pub value: ConfigTree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Overwrite whatever is stored.
    #[default]
    LastWriterWins,
    /// Fail with [`StoreError::RevisionConflict`] unless the stored revision matches.
    IfRevision(u64),
}

/// Whole-document persistence of tenant configs.
pub trait TenantConfigStore: Send + Sync {
    fn fetch(&self, tenant: &str) -> Result<Option<StoredConfig>, StoreError>;

    /// Replaces the tenant document and returns its new revision.
    fn replace(&self, tenant: &str, value: ConfigTree, mode: WriteMode) -> Result<u64, StoreError>;
}

pub fn validate_tenant_id(tenant: &str) -> Result<(), StoreError> {
    let valid = TENANT_ID.as_ref().is_some_and(|re| re.is_match(tenant));
    if !valid {
        return Err(StoreError::InvalidTenant {
            tenant: tenant.to_string(),
        });
    }
    Ok(())
}

fn check_revision(tenant: &str, mode: WriteMode, current: u64) -> Result<(), StoreError> {
    match mode {
        WriteMode::IfRevision(expected) if expected != current => Err(StoreError::RevisionConflict {
            tenant: tenant.to_string(),
            expected,
            found: current,
        }),
        _ => Ok(()),
    }
}

fn next_document(tenant: &str, value: ConfigTree, current: u64) -> StoredConfig {
    StoredConfig {
        tenant: tenant.to_string(),
        key: CONFIG_KEY.to_string(),
        revision: current + 1,
        updated_at: Utc::now(),
        value,
    }
}

/// Keeps `<root>/<tenant>/config.json`, written atomically.
pub struct FileConfigStore {
    root: PathBuf,
}

impl FileConfigStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Root from `POLICY_STORE_DIR`, or `.policy/tenants`.
    pub fn from_env() -> Self {
        let root = std::env::var(STORE_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORE_DIR));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, tenant: &str) -> Result<PathBuf, StoreError> {
        validate_tenant_id(tenant)?;
        Ok(self.root.join(tenant).join(format!("{CONFIG_KEY}.json")))
    }

    fn read(&self, path: &Path) -> Result<Option<StoredConfig>, StoreError> {
        if !path.exists() {
            debug!("No tenant config at {}", path.display());
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|e| StoreError::FileReadError {
            message: format!("{}: {}", path.display(), e),
        })?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::JsonError {
                message: format!("{}: {}", path.display(), e),
            })
    }
}

impl TenantConfigStore for FileConfigStore {
    fn fetch(&self, tenant: &str) -> Result<Option<StoredConfig>, StoreError> {
        let path = self.path_for(tenant)?;
        self.read(&path)
    }

    fn replace(&self, tenant: &str, value: ConfigTree, mode: WriteMode) -> Result<u64, StoreError> {
        let path = self.path_for(tenant)?;
        let current = self.read(&path)?.map_or(0, |doc| doc.revision);
        check_revision(tenant, mode, current)?;

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| StoreError::FileWriteError {
            message: format!("Failed to create directory {}: {}", parent.display(), e),
        })?;

        let doc = next_document(tenant, value, current);
        let json = serde_json::to_string_pretty(&doc).map_err(|e| StoreError::JsonError {
            message: e.to_string(),
        })?;

        let mut temp_file = NamedTempFile::new_in(parent).map_err(|e| StoreError::FileWriteError {
            message: format!("Failed to create temp file: {}", e),
        })?;
        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| StoreError::FileWriteError {
                message: format!("Failed to write to temp file: {}", e),
            })?;
        temp_file.flush().map_err(|e| StoreError::FileWriteError {
            message: format!("Failed to flush temp file: {}", e),
        })?;

        // Another process may have written while we serialized.
        if let WriteMode::IfRevision(_) = mode {
            let latest = self.read(&path)?.map_or(0, |doc| doc.revision);
            if latest != current {
                warn!(tenant, expected = current, found = latest, "concurrent tenant config write detected");
                return Err(StoreError::RevisionConflict {
                    tenant: tenant.to_string(),
                    expected: current,
                    found: latest,
                });
            }
        }

        temp_file.persist(&path).map_err(|e| StoreError::FileWriteError {
            message: format!("Failed to persist temp file: {}", e),
        })?;

        debug!("Tenant config saved to {} at revision {}", path.display(), doc.revision);
        Ok(doc.revision)
    }
}

/// In-process store for tests and embedding.
#[derive(Default)]
pub struct MemoryConfigStore {
    docs: RwLock<HashMap<String, StoredConfig>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TenantConfigStore for MemoryConfigStore {
    fn fetch(&self, tenant: &str) -> Result<Option<StoredConfig>, StoreError> {
        validate_tenant_id(tenant)?;
        let docs = self.docs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(docs.get(tenant).cloned())
    }

    fn replace(&self, tenant: &str, value: ConfigTree, mode: WriteMode) -> Result<u64, StoreError> {
        validate_tenant_id(tenant)?;
        let mut docs = self.docs.write().map_err(|_| StoreError::Poisoned)?;
        let current = docs.get(tenant).map_or(0, |doc| doc.revision);
        check_revision(tenant, mode, current)?;
        let doc = next_document(tenant, value, current);
        let revision = doc.revision;
        docs.insert(tenant.to_string(), doc);
        Ok(revision)
    }
}
