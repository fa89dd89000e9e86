//! Dotted addresses into a tenant configuration document.
//!
//! Paths are parsed once into their key segments; lookups and writes walk
//! the segments and never split strings again.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Root key holding every automation rule inside a tenant document.
pub const POLICY_ROOT: &str = "auto_notification";

/// Per-rule key of the on/off switch.
pub const ENABLED_FIELD: &str = "enabled";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("policy path is empty")]
    Empty,

    #[error("policy path '{path}' contains an empty key")]
    EmptySegment { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyPath {
    raw: String,
    segments: Vec<String>,
}

impl PolicyPath {
    /// Parse a dotted path. Keys cannot contain dots and cannot be empty.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment {
                path: raw.to_string(),
            });
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// `auto_notification.<event>.<field>`. `field` may be dotted for grouped
    /// parameters such as `throttle.daily_limit`.
    pub fn for_event(event: &str, field: &str) -> Result<Self, PathError> {
        Self::parse(&format!("{POLICY_ROOT}.{event}.{field}"))
    }

    pub fn enabled(event: &str) -> Result<Self, PathError> {
        Self::for_event(event, ENABLED_FIELD)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Rule id addressed by this path, if it lives under the policy root.
    pub fn event(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [root, event, ..] if root == POLICY_ROOT => Some(event.as_str()),
            _ => None,
        }
    }

    /// Segments below `auto_notification.<event>`, or `None` when the path is
    /// owned by another rule (or by no rule at all).
    pub fn relative_to(&self, event: &str) -> Option<&[String]> {
        match self.segments.as_slice() {
            [root, owner, rest @ ..] if root == POLICY_ROOT && owner == event && !rest.is_empty() => {
                Some(rest)
            }
            _ => None,
        }
    }
}

impl fmt::Display for PolicyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PolicyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PolicyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for PolicyPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
