//! Domain types for kitchen-ssh configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ── Key material ─────────────────────────────────────────────────────────────

/// SSH key material as written in configuration or state: one path or many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyMaterial {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl KeyMaterial {
    /// Normalize to an ordered list of key paths.
    #[must_use]
    pub fn to_paths(&self) -> Vec<PathBuf> {
        match self {
            Self::One(path) => vec![path.clone()],
            Self::Many(paths) => paths.clone(),
        }
    }
}

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `.kitchen-ssh.yml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KitchenConfig {
    pub driver: DriverConfig,
    pub provisioner: ShellProvisionerConfig,
    pub verifier: ShellVerifierConfig,
}

/// Driver settings, immutable for the lifetime of a driver instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Prefix privileged commands with `sudo -E`.
    #[serde(default = "default_sudo")]
    pub sudo: bool,
    /// SSH port. `null` in YAML leaves the choice to the transport.
    #[serde(default = "default_port")]
    pub port: Option<u16>,
    /// Name of the compressor used for file transfers.
    #[serde(default = "default_compression")]
    pub compression: String,
    #[serde(default)]
    pub http_proxy: Option<String>,
    #[serde(default)]
    pub https_proxy: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub ssh_key: Option<KeyMaterial>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub forward_agent: Option<bool>,
    /// Seconds allowed for a single connection attempt.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
    /// Seconds to wait for the instance to accept SSH logins.
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout: u64,
    /// Seconds allowed for a single remote command or upload.
    #[serde(default = "default_command_timeout")]
    pub command_timeout: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            sudo: default_sudo(),
            port: default_port(),
            compression: default_compression(),
            http_proxy: None,
            https_proxy: None,
            hostname: None,
            username: None,
            ssh_key: None,
            password: None,
            forward_agent: None,
            connection_timeout: default_connection_timeout(),
            ready_timeout: default_ready_timeout(),
            command_timeout: default_command_timeout(),
        }
    }
}

impl DriverConfig {
    /// Wrap `command` in an `env` invocation carrying the configured proxies.
    ///
    /// Returns the command unchanged when no proxy is configured.
    #[must_use]
    pub fn env_command(&self, command: &str) -> String {
        let mut env = String::from("env");
        if let Some(proxy) = &self.http_proxy {
            env.push_str(&format!(" http_proxy={proxy}"));
        }
        if let Some(proxy) = &self.https_proxy {
            env.push_str(&format!(" https_proxy={proxy}"));
        }
        if env == "env" {
            command.to_string()
        } else {
            format!("{env} {command}")
        }
    }

    /// Prefix `command` with `sudo -E` when `sudo` is enabled.
    #[must_use]
    pub fn sudo_command(&self, command: &str) -> String {
        if self.sudo {
            format!("sudo -E {command}")
        } else {
            command.to_string()
        }
    }
}

fn default_sudo() -> bool {
    true
}

#[allow(clippy::unnecessary_wraps)] // serde default for an optional field
fn default_port() -> Option<u16> {
    Some(22)
}

fn default_compression() -> String {
    "gzip".to_string()
}

fn default_connection_timeout() -> u64 {
    15
}

fn default_ready_timeout() -> u64 {
    300
}

fn default_command_timeout() -> u64 {
    3600
}

/// Settings for the shell provisioner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellProvisionerConfig {
    /// Local script executed on the instance during converge.
    pub script: PathBuf,
    /// Optional local directory shipped alongside the script as `data/`.
    pub data_path: Option<PathBuf>,
    /// Remote directory the sandbox is unpacked into.
    pub root_path: String,
}

impl Default for ShellProvisionerConfig {
    fn default() -> Self {
        Self {
            script: PathBuf::from("bootstrap.sh"),
            data_path: None,
            root_path: "/tmp/kitchen".to_string(),
        }
    }
}

/// Commands for the shell verifier. Each one is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ShellVerifierConfig {
    pub setup_command: Option<String>,
    pub sync_command: Option<String>,
    pub run_command: Option<String>,
}

// ── Unit tests ───────────────────────────────────────────────────────────────
