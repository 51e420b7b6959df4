//! Shell verifier: opaque setup/sync/run commands from configuration.

use crate::application::ports::TestTool;
use crate::domain::{DriverConfig, ShellVerifierConfig};

pub struct ShellVerifier {
    config: ShellVerifierConfig,
    driver: DriverConfig,
}

impl ShellVerifier {
    #[must_use]
    pub fn new(config: ShellVerifierConfig, driver: &DriverConfig) -> Self {
        Self {
            config,
            driver: driver.clone(),
        }
    }

    fn prefixed(&self, command: Option<&String>) -> Option<String> {
        command.map(|c| self.driver.sudo_command(c))
    }
}

impl TestTool for ShellVerifier {
    fn setup_command(&self) -> Option<String> {
        self.prefixed(self.config.setup_command.as_ref())
    }

    fn sync_command(&self) -> Option<String> {
        self.prefixed(self.config.sync_command.as_ref())
    }

    fn run_command(&self) -> Option<String> {
        self.prefixed(self.config.run_command.as_ref())
    }
}
