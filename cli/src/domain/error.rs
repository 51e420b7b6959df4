//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! Every error the lifecycle core hands to its callers is a `DriverError`;
//! adapters keep using `anyhow` and are translated at the core's boundary.

use thiserror::Error;

// ── Driver errors ─────────────────────────────────────────────────────────────

/// Errors surfaced by the lifecycle driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A backend did not supply `create` or `destroy`.
    #[error("{backend} must implement {action}")]
    NotImplemented {
        backend: &'static str,
        action: &'static str,
    },

    /// A remote command or file transfer failed. All transport error kinds
    /// collapse into this variant; `message` keeps the transport's text.
    #[error("{message}")]
    ActionFailed { message: String },

    #[error("Unknown compression: {name}\n\nValid values: {valid}")]
    UnknownCompressor { name: String, valid: String },

    #[error("compressing transfer payload: {0:#}")]
    Compression(anyhow::Error),

    #[error("sandbox: {0:#}")]
    Sandbox(anyhow::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DriverError {
    /// Collapse any transport error into `ActionFailed`, keeping the full
    /// context chain as the message.
    #[must_use]
    pub fn action_failed(err: &anyhow::Error) -> Self {
        Self::ActionFailed {
            message: format!("{err:#}"),
        }
    }

    /// Returns `true` for the unified transport failure kind.
    #[must_use]
    pub fn is_action_failed(&self) -> bool {
        matches!(self, Self::ActionFailed { .. })
    }
}

// ── State errors ──────────────────────────────────────────────────────────────

/// Errors related to the persisted instance state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Instance '{0}' has not been created. Run 'kitchen-ssh create' first.")]
    NotCreated(String),

    #[error("Invalid instance name '{0}': must match ^[a-z0-9]([a-z0-9_-]{{0,61}}[a-z0-9])?$")]
    InvalidName(String),
}
