//! Connection resolution: driver config ⊕ runtime state → connection descriptor.
//!
//! Pure functions only. A descriptor is rebuilt on every lifecycle call and
//! never cached, so a changed state file or config takes effect immediately.

use std::path::PathBuf;

use crate::domain::config::DriverConfig;
use crate::domain::state::RuntimeState;

/// Known-hosts file handed to the transport. Host keys of ephemeral
/// instances are never persisted.
pub const NULL_KNOWN_HOSTS: &str = "/dev/null";

/// Transport options for one connection.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub user_known_hosts_file: PathBuf,
    pub strict_host_key_checking: bool,
    /// Only offer the listed keys; set whenever key material is known.
    pub keys_only: bool,
    pub password: Option<String>,
    /// `None` means "not configured", which is different from `Some(false)`.
    pub forward_agent: Option<bool>,
    pub port: Option<u16>,
    pub keys: Vec<PathBuf>,
    /// Span every transport log line for this connection is recorded in.
    pub logger: tracing::Span,
}

impl ConnectionOptions {
    /// Options with nothing forwarded beyond the fixed host-key policy.
    #[must_use]
    pub fn new(logger: tracing::Span) -> Self {
        Self {
            user_known_hosts_file: PathBuf::from(NULL_KNOWN_HOSTS),
            strict_host_key_checking: false,
            keys_only: false,
            password: None,
            forward_agent: None,
            port: None,
            keys: Vec::new(),
            logger,
        }
    }
}

/// Everything a transport needs to open a session.
#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub user: String,
    pub options: ConnectionOptions,
}

impl ConnectionDescriptor {
    /// `user@host`, or just `host` when no user is known.
    #[must_use]
    pub fn target(&self) -> String {
        if self.user.is_empty() {
            self.host.clone()
        } else {
            format!("{}@{}", self.user, self.host)
        }
    }
}

/// Merge `config` and `state` into a connection descriptor.
///
/// `state` wins for every field both define. Optional fields absent from both
/// layers are left unset rather than forwarded empty.
#[must_use]
pub fn resolve(config: &DriverConfig, state: &RuntimeState) -> ConnectionDescriptor {
    let host = state
        .hostname
        .clone()
        .or_else(|| config.hostname.clone())
        .unwrap_or_default();
    let user = state
        .username
        .clone()
        .or_else(|| config.username.clone())
        .unwrap_or_default();

    let logger = tracing::info_span!("ssh", host = %host, user = %user);
    let mut options = ConnectionOptions::new(logger);

    if let Some(keys) = state.ssh_key.as_ref().or(config.ssh_key.as_ref()) {
        options.keys_only = true;
        options.keys = keys.to_paths();
    }
    options.password = state.password.clone().or_else(|| config.password.clone());
    options.forward_agent = state.forward_agent.or(config.forward_agent);
    options.port = state.port.or(config.port);

    ConnectionDescriptor {
        host,
        user,
        options,
    }
}
