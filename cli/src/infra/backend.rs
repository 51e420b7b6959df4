//! Static backend: the instance already exists and is addressed from config.

use crate::application::ports::InstanceBackend;
use crate::domain::{DriverConfig, DriverError, RuntimeState};

/// Backend for pre-existing machines. `create` records how to reach them;
/// `destroy` forgets them without touching the machine.
#[derive(Debug, Clone)]
pub struct StaticBackend {
    config: DriverConfig,
}

impl StaticBackend {
    #[must_use]
    pub fn new(config: &DriverConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl InstanceBackend for StaticBackend {
    async fn create(&self, state: &mut RuntimeState) -> Result<(), DriverError> {
        if state.hostname.is_none() {
            state.hostname = Some(self.config.hostname.clone().ok_or_else(|| {
                DriverError::Config("driver.hostname is required for a static instance".into())
            })?);
        }
        if state.username.is_none() {
            state.username.clone_from(&self.config.username);
        }
        if state.port.is_none() {
            state.port = self.config.port;
        }
        tracing::info!(hostname = state.hostname.as_deref(), "instance recorded");
        Ok(())
    }

    async fn destroy(&self, state: &mut RuntimeState) -> Result<(), DriverError> {
        state.hostname = None;
        state.username = None;
        state.ssh_key = None;
        state.password = None;
        state.forward_agent = None;
        state.port = None;
        Ok(())
    }
}
