//! Instance lifecycle: create, converge, setup, verify, destroy.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! Every operation that talks to the instance opens its own session and
//! closes it on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::application::ports::{
    Compressor, InstanceBackend, LoginCommand, Provisioner, RemoteSession, TestTool, Transport,
};
use crate::application::services::remote_command::RemoteCommandRunner;
use crate::application::services::transfer::TransferPipeline;
use crate::domain::{
    ConnectionDescriptor, ConnectionOptions, DriverConfig, DriverError, RuntimeState, resolve,
};

/// Builds a compressor for a configured name.
pub trait CompressorSource {
    /// # Errors
    ///
    /// Returns `DriverError::UnknownCompressor` if no compressor is registered
    /// under `name`.
    fn build(&self, name: &str) -> Result<Box<dyn Compressor + Send + Sync>, DriverError>;
}

/// Lifecycle driver for one instance configuration.
///
/// Generic over the backend that creates and destroys instances and the
/// transport that reaches them.
pub struct Driver<B, T> {
    config: DriverConfig,
    backend: B,
    transport: T,
    compressor: Arc<dyn Compressor + Send + Sync>,
}

impl<B: InstanceBackend, T: Transport> Driver<B, T> {
    /// Build a driver, resolving the configured compressor up front.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::UnknownCompressor` if `config.compression` names
    /// no registered compressor.
    pub fn new(
        config: DriverConfig,
        backend: B,
        transport: T,
        compressors: &impl CompressorSource,
    ) -> Result<Self, DriverError> {
        let compressor = Arc::from(compressors.build(&config.compression)?);
        Ok(Self {
            config,
            backend,
            transport,
            compressor,
        })
    }

    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Connection parameters for `state`, recomputed on every call.
    #[must_use]
    pub fn connection(&self, state: &RuntimeState) -> ConnectionDescriptor {
        resolve(&self.config, state)
    }

    /// # Errors
    ///
    /// Returns whatever the backend reports; `DriverError::NotImplemented`
    /// when the backend does not support creation.
    pub async fn create(&self, state: &mut RuntimeState) -> Result<(), DriverError> {
        self.backend.create(state).await
    }

    /// # Errors
    ///
    /// Returns whatever the backend reports; `DriverError::NotImplemented`
    /// when the backend does not support destruction.
    pub async fn destroy(&self, state: &mut RuntimeState) -> Result<(), DriverError> {
        self.backend.destroy(state).await
    }

    /// Install and run the provisioner's payload on the instance.
    ///
    /// The provisioner's sandbox is cleaned up exactly once, whatever the
    /// outcome. If both a step and the cleanup fail, the step's error is
    /// returned and the cleanup error is logged.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Sandbox` if the sandbox cannot be built, listed or
    /// removed, and `DriverError::ActionFailed` if a remote step fails.
    pub async fn converge(
        &self,
        state: &RuntimeState,
        provisioner: &mut impl Provisioner,
    ) -> Result<(), DriverError> {
        let result = self.converge_steps(state, provisioner).await;
        let cleanup = provisioner.cleanup_sandbox().await;
        match (result, cleanup) {
            (Err(e), Err(cleanup_err)) => {
                tracing::warn!("sandbox cleanup after failed converge also failed: {cleanup_err:#}");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), Err(cleanup_err)) => Err(DriverError::Sandbox(cleanup_err)),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    async fn converge_steps(
        &self,
        state: &RuntimeState,
        provisioner: &mut impl Provisioner,
    ) -> Result<(), DriverError> {
        provisioner
            .create_sandbox()
            .await
            .map_err(DriverError::Sandbox)?;
        let sandbox = provisioner
            .sandbox_path()
            .context("provisioner reported no sandbox after creating it")
            .map_err(DriverError::Sandbox)?
            .to_path_buf();
        let entries = tokio::task::spawn_blocking(move || sandbox_entries(&sandbox))
            .await
            .context("spawn_blocking for sandbox listing")
            .and_then(|entries| entries)
            .map_err(DriverError::Sandbox)?;

        let provisioner = &*provisioner;
        let runner = self.runner();
        let pipeline = TransferPipeline::new(Arc::clone(&self.compressor), runner);
        let session = self.open(state).await?;
        let result = async {
            runner
                .run(provisioner.install_command().as_deref(), &session)
                .await?;
            runner
                .run(provisioner.init_command().as_deref(), &session)
                .await?;
            pipeline
                .transfer(&entries, provisioner.root_path(), &session)
                .await?;
            runner
                .run(provisioner.prepare_command().as_deref(), &session)
                .await?;
            runner
                .run(provisioner.run_command().as_deref(), &session)
                .await
        }
        .await;
        close(session, result).await
    }

    /// Prepare the test tool on the instance.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::ActionFailed` if the session or command fails.
    pub async fn setup(
        &self,
        state: &RuntimeState,
        test_tool: &impl TestTool,
    ) -> Result<(), DriverError> {
        let runner = self.runner();
        let session = self.open(state).await?;
        let result = runner
            .run(test_tool.setup_command().as_deref(), &session)
            .await;
        close(session, result).await
    }

    /// Sync and run the tests on the instance.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::ActionFailed` if the session or a command fails.
    pub async fn verify(
        &self,
        state: &RuntimeState,
        test_tool: &impl TestTool,
    ) -> Result<(), DriverError> {
        let runner = self.runner();
        let session = self.open(state).await?;
        let result = async {
            runner
                .run(test_tool.sync_command().as_deref(), &session)
                .await?;
            runner
                .run(test_tool.run_command().as_deref(), &session)
                .await
        }
        .await;
        close(session, result).await
    }

    /// Interactive login invocation for `state`. Opens nothing.
    #[must_use]
    pub fn login_command(&self, state: &RuntimeState) -> LoginCommand {
        self.transport.login_command(&self.connection(state))
    }

    /// Run a single caller-supplied command on the instance.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::ActionFailed` if the session or command fails.
    pub async fn remote_command(
        &self,
        state: &RuntimeState,
        command: &str,
    ) -> Result<(), DriverError> {
        self.raw_ssh(&self.connection(state), command).await
    }

    /// Run a command over an already-resolved connection.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::ActionFailed` if the session or command fails.
    pub async fn raw_ssh(
        &self,
        descriptor: &ConnectionDescriptor,
        command: &str,
    ) -> Result<(), DriverError> {
        let session = self.open_descriptor(descriptor).await?;
        let result = self.runner().run(Some(command), &session).await;
        close(session, result).await
    }

    /// Block until `hostname` accepts logins as `username`.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::ActionFailed` if the transport gives up.
    pub async fn wait_for_ready(
        &self,
        hostname: &str,
        username: &str,
        options: &ConnectionOptions,
    ) -> Result<(), DriverError> {
        let descriptor = ConnectionDescriptor {
            host: hostname.to_string(),
            user: username.to_string(),
            options: options.clone(),
        };
        tracing::info!(target = %descriptor.target(), "waiting for ssh");
        self.transport
            .wait_until_ready(&descriptor)
            .await
            .map_err(|e| DriverError::action_failed(&e))
    }

    fn runner(&self) -> RemoteCommandRunner<'_> {
        RemoteCommandRunner::new(&self.config)
    }

    async fn open(&self, state: &RuntimeState) -> Result<T::Session, DriverError> {
        self.open_descriptor(&self.connection(state)).await
    }

    async fn open_descriptor(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<T::Session, DriverError> {
        self.transport
            .open(descriptor)
            .await
            .map_err(|e| DriverError::action_failed(&e))
    }
}

/// Close `session`, keeping `result` as the outcome unless it succeeded and
/// the close failed.
async fn close<S: RemoteSession>(
    session: S,
    result: Result<(), DriverError>,
) -> Result<(), DriverError> {
    match (result, session.close().await) {
        (Ok(()), Err(e)) => Err(DriverError::action_failed(&e)),
        (Err(e), Err(close_err)) => {
            tracing::warn!("closing session after failure: {close_err:#}");
            Err(e)
        }
        (result, Ok(())) => result,
    }
}

/// Top-level entries of the sandbox, sorted by name.
fn sandbox_entries(sandbox: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(sandbox)
        .with_context(|| format!("reading sandbox {}", sandbox.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("listing sandbox {}", sandbox.display()))?;
    entries.sort();
    Ok(entries)
}
