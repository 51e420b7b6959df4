//! File delivery: compress local paths, upload support files and the archive,
//! then unpack remotely.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::application::ports::{Archive, Compressor, RemoteSession};
use crate::application::services::remote_command::RemoteCommandRunner;
use crate::domain::DriverError;

/// Moves a local payload onto the instance through one compressor.
pub struct TransferPipeline<'a> {
    compressor: Arc<dyn Compressor + Send + Sync>,
    runner: RemoteCommandRunner<'a>,
}

impl<'a> TransferPipeline<'a> {
    #[must_use]
    pub fn new(
        compressor: Arc<dyn Compressor + Send + Sync>,
        runner: RemoteCommandRunner<'a>,
    ) -> Self {
        Self { compressor, runner }
    }

    /// Deliver `local_paths` into `remote_root`.
    ///
    /// An empty slice is a no-op: neither the compressor nor the session is
    /// touched. The archive is cleaned up after the upload, whether it
    /// succeeded or not.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Compression` if the archive cannot be built and
    /// `DriverError::ActionFailed` if an upload or the unpack step fails.
    pub async fn transfer(
        &self,
        local_paths: &[PathBuf],
        remote_root: &str,
        session: &impl RemoteSession,
    ) -> Result<(), DriverError> {
        if local_paths.is_empty() {
            return Ok(());
        }

        let compressor = Arc::clone(&self.compressor);
        let paths = local_paths.to_vec();
        let archive = tokio::task::spawn_blocking(move || compressor.compress(&paths))
            .await
            .context("spawn_blocking for compress")
            .and_then(|archive| archive)
            .map_err(DriverError::Compression)?;
        tracing::debug!(
            compressor = self.compressor.name(),
            archive = %archive.path().display(),
            "payload compressed"
        );

        let result = self.deliver(&archive, remote_root, session).await;
        let cleanup = tokio::task::spawn_blocking(move || archive.cleanup())
            .await
            .context("spawn_blocking for archive cleanup")
            .and_then(|cleanup| cleanup);
        if let Err(e) = cleanup {
            tracing::warn!("failed to remove local archive: {e:#}");
        }
        result
    }

    async fn deliver(
        &self,
        archive: &Archive,
        remote_root: &str,
        session: &impl RemoteSession,
    ) -> Result<(), DriverError> {
        let file_name = archive.file_name().map_err(DriverError::Compression)?;

        for support in self.compressor.supports() {
            session
                .upload(&support, remote_root)
                .await
                .map_err(|e| DriverError::action_failed(&e))?;
        }
        session
            .upload(archive.path(), remote_root)
            .await
            .map_err(|e| DriverError::action_failed(&e))?;

        if let Some(unpack) = self.compressor.unpack_command(file_name) {
            let step = format!("cd {remote_root} && {unpack} && rm {file_name}");
            self.runner.run_verbatim(&step, session).await?;
        }
        Ok(())
    }
}
