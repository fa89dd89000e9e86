pub mod catalog;
pub mod tenant;

use anyhow::{anyhow, Result};
use config_loader::FileConfigStore;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use wards::{load_from_env, Registries, WardsConfig};

/// Everything a command needs: checked registries, engine settings and the store.
pub struct Context {
    pub registries: Arc<Registries>,
    pub config: WardsConfig,
    pub store: FileConfigStore,
}

impl Context {
    pub fn load(registry: Option<&Path>, store_dir: &Path) -> Result<Self> {
        let config = load_from_env()?;
        debug!(?config, "loaded engine settings");
        let registries = load_registries(registry)?
            .validated(config.validation_mode)
            .map_err(|errors| anyhow!("{}", errors.report()))?;
        Ok(Self {
            registries: Arc::new(registries),
            config,
            store: FileConfigStore::new(store_dir),
        })
    }
}

/// Registries from `path`, or the built-in tables. Not yet cross-checked.
pub fn load_registries(path: Option<&Path>) -> Result<Registries> {
    let registries = match path {
        Some(path) => Registries::from_path(path)?,
        None => Registries::builtin()?,
    };
    Ok(registries)
}

pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    std::io::stdout().is_terminal()
}
