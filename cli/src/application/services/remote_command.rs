//! Single remote command execution with proxy env injection and error
//! translation.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use crate::application::ports::RemoteSession;
use crate::domain::{DriverConfig, DriverError};

/// Runs one logical command over an open session.
#[derive(Clone, Copy)]
pub struct RemoteCommandRunner<'a> {
    config: &'a DriverConfig,
}

impl<'a> RemoteCommandRunner<'a> {
    #[must_use]
    pub fn new(config: &'a DriverConfig) -> Self {
        Self { config }
    }

    /// Run `command` remotely, prefixed with the configured proxy env.
    ///
    /// `None` is a no-op so optional provisioner steps can be passed through
    /// unconditionally.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::ActionFailed` if the session reports any failure.
    pub async fn run(
        &self,
        command: Option<&str>,
        session: &impl RemoteSession,
    ) -> Result<(), DriverError> {
        let Some(command) = command else {
            return Ok(());
        };
        self.run_verbatim(&self.config.env_command(command), session)
            .await
    }

    /// Run `command` exactly as given, without env wrapping.
    ///
    /// Used for compound steps starting with a shell builtin such as `cd`,
    /// which `env` cannot execute. Such steps run without the proxy env on
    /// purpose: the transfer unpack step is the one caller.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::ActionFailed` if the session reports any failure.
    pub async fn run_verbatim(
        &self,
        command: &str,
        session: &impl RemoteSession,
    ) -> Result<(), DriverError> {
        tracing::debug!(%command, "running remote command");
        session
            .exec(command)
            .await
            .map_err(|e| DriverError::action_failed(&e))
    }
}
