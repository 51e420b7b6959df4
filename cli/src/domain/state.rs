//! Runtime state describing a live instance.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::config::KeyMaterial;
use crate::domain::error::StateError;

/// Caller-supplied description of a live instance.
///
/// Every connection field present here overrides the matching
/// [`DriverConfig`](crate::domain::DriverConfig) field when a connection is
/// resolved. Backend-specific keys (server ids, image names, ...) are kept
/// verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<KeyMaterial>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_agent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RuntimeState {
    /// Returns `true` when the state carries no connection fields.
    #[must_use]
    pub fn is_unprovisioned(&self) -> bool {
        self.hostname.is_none()
    }
}

/// Validates an instance name used for the state file name.
///
/// # Errors
///
/// Returns an error if the name is empty, too long, or contains characters
/// outside `[a-z0-9_-]`, or starts/ends with a separator.
pub fn validate_instance_name(name: &str) -> Result<()> {
    let valid_char = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let ok = !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| valid_char(c) || c == '-' || c == '_')
        && name.starts_with(valid_char)
        && name.ends_with(valid_char);
    if !ok {
        return Err(StateError::InvalidName(name.to_string()).into());
    }
    Ok(())
}
