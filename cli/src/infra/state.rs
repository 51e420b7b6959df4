//! Infrastructure implementation of the `StateStore` port.
//!
//! `JsonStateStore` keeps one JSON file per instance under `.kitchen/`, using
//! `tokio::task::spawn_blocking` and an atomic write (temp file + rename).

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::StateStore;
use crate::domain::{RuntimeState, validate_instance_name};

/// Directory holding per-instance state files, relative to the project root.
pub const STATE_DIR: &str = ".kitchen";

/// State file manager for a single instance.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    /// Store for `instance` at `<project_root>/.kitchen/<instance>.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if `instance` is not a valid instance name.
    pub fn for_instance(project_root: &Path, instance: &str) -> Result<Self> {
        validate_instance_name(instance)?;
        Ok(Self::with_path(
            project_root.join(STATE_DIR).join(format!("{instance}.json")),
        ))
    }

    /// Store with an explicit path (used in tests).
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_sync(&self) -> Result<Option<RuntimeState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading state file {}", self.path.display()))?;
        let state = serde_json::from_str(&content)
            .with_context(|| format!("parsing state file {}", self.path.display()))?;
        Ok(Some(state))
    }

    fn save_sync(&self, state: &RuntimeState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(state).context("serializing state")?;

        let temp_path = self.path.with_extension("json.tmp");
        // May hold a password: never readable by others, not even briefly.
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&temp_path)
            .with_context(|| format!("creating temp file {}", temp_path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }
        file.write_all(content.as_bytes())
            .and_then(|()| file.sync_all())
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;
        drop(file);

        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("finalizing state file {}", self.path.display()))
    }

    fn clear_sync(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("removing state file {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl StateStore for JsonStateStore {
    async fn load(&self) -> Result<Option<RuntimeState>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.load_sync())
            .await
            .context("state load task panicked")?
    }

    async fn save(&self, state: &RuntimeState) -> Result<()> {
        let store = self.clone();
        let state = state.clone();
        tokio::task::spawn_blocking(move || store.save_sync(&state))
            .await
            .context("state save task panicked")?
    }

    async fn clear(&self) -> Result<()> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.clear_sync())
            .await
            .context("state clear task panicked")?
    }
}
