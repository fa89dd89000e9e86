use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const VALIDATION_MODE_VAR: &str = "WARDS_VALIDATION_MODE";
pub const LEGACY_FALLBACK_VAR: &str = "WARDS_LEGACY_FALLBACK";
pub const PROVISION_ENABLED_VAR: &str = "WARDS_PROVISION_ENABLED";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}='{value}' is invalid: expected {expected}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// What to do when the registries disagree with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Refuse to load.
    Strict,
    /// Log every inconsistency and continue.
    #[default]
    Advisory,
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "advisory" => Ok(Self::Advisory),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Advisory => f.write_str("advisory"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WardsConfig {
    pub validation_mode: ValidationMode,
    /// Read renamed rules from their pre-rename location when the current one is unset.
    pub legacy_fallback: bool,
    /// Active rules start enabled in a freshly provisioned tenant.
    pub provision_enabled: bool,
}

impl Default for WardsConfig {
    fn default() -> Self {
        Self {
            validation_mode: ValidationMode::Advisory,
            legacy_fallback: true,
            provision_enabled: true,
        }
    }
}

impl WardsConfig {
    /// Builds the config from any variable source. Unset variables keep
    /// their default; malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(raw) = lookup(VALIDATION_MODE_VAR).filter(|s| !s.trim().is_empty()) {
            cfg.validation_mode = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                var: VALIDATION_MODE_VAR,
                value: raw.clone(),
                expected: "strict or advisory",
            })?;
        }
        if let Some(raw) = lookup(LEGACY_FALLBACK_VAR) {
            cfg.legacy_fallback = parse_flag(LEGACY_FALLBACK_VAR, &raw)?;
        }
        if let Some(raw) = lookup(PROVISION_ENABLED_VAR) {
            cfg.provision_enabled = parse_flag(PROVISION_ENABLED_VAR, &raw)?;
        }
        Ok(cfg)
    }
}

pub fn load_from_env() -> Result<WardsConfig, ConfigError> {
    WardsConfig::from_lookup(|var| std::env::var(var).ok())
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var,
            value: raw.to_string(),
            expected: "0 or 1",
        }),
    }
}
