//! Application context: unified state passed to every command handler.
//!
//! `AppContext` is built once in `Cli::run()` from the global flags: it loads
//! the configuration, wires the driver to its production adapters and points
//! the state store at the selected instance.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::StateStore;
use crate::application::Driver;
use crate::domain::{KitchenConfig, RuntimeState, StateError};
use crate::infra::backend::StaticBackend;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::compression::CompressorRegistry;
use crate::infra::config::YamlConfigStore;
use crate::infra::openssh::OpenSshTransport;
use crate::infra::provisioner::ShellProvisioner;
use crate::infra::state::JsonStateStore;
use crate::infra::verifier::ShellVerifier;
use crate::output::OutputContext;

/// Driver type used by the CLI.
pub type CliDriver = Driver<StaticBackend, OpenSshTransport<TokioCommandRunner>>;

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Explicit configuration file (`--config` / `KITCHEN_SSH_CONFIG`).
    pub config: Option<PathBuf>,
    /// Instance name selecting the state file.
    pub instance: String,
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Loaded configuration.
    pub config: KitchenConfig,
    /// Lifecycle driver wired to OpenSSH and the static backend.
    pub driver: CliDriver,
    /// State store for the selected instance.
    pub state: JsonStateStore,
    /// Selected instance name.
    pub instance: String,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory is unavailable, the config
    /// cannot be loaded, the instance name is invalid or the configured
    /// compression is unknown.
    pub fn new(flags: AppFlags) -> Result<Self> {
        let root = std::env::current_dir().context("cannot determine working directory")?;
        let config = YamlConfigStore::locate(flags.config, &root).load()?;
        let state = JsonStateStore::for_instance(&root, &flags.instance)?;
        let driver = Driver::new(
            config.driver.clone(),
            StaticBackend::new(&config.driver),
            OpenSshTransport::from_config(&config.driver),
            &CompressorRegistry::with_builtins(),
        )?;

        Ok(Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            config,
            driver,
            state,
            instance: flags.instance,
        })
    }

    /// Load the instance state, failing when it was never created.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotCreated` if no state file exists, or an error
    /// if it cannot be read.
    pub async fn require_state(&self) -> Result<RuntimeState> {
        match self.state.load().await? {
            Some(state) if !state.is_unprovisioned() => Ok(state),
            _ => Err(StateError::NotCreated(self.instance.clone()).into()),
        }
    }

    /// Local process runner bounded by `driver.command_timeout`.
    #[must_use]
    pub fn process_runner(&self) -> TokioCommandRunner {
        TokioCommandRunner::new(Duration::from_secs(self.config.driver.command_timeout))
    }

    /// Shell provisioner built from the `provisioner` section.
    #[must_use]
    pub fn provisioner(&self) -> ShellProvisioner {
        ShellProvisioner::new(self.config.provisioner.clone(), &self.config.driver)
    }

    /// Shell verifier built from the `verifier` section.
    #[must_use]
    pub fn verifier(&self) -> ShellVerifier {
        ShellVerifier::new(self.config.verifier.clone(), &self.config.driver)
    }
}
