//! YAML configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::KitchenConfig;

/// Default configuration file name, relative to the project root.
pub const CONFIG_FILE: &str = ".kitchen-ssh.yml";

/// Loads [`KitchenConfig`] from a YAML file on disk.
#[derive(Debug, Clone)]
pub struct YamlConfigStore {
    path: PathBuf,
    required: bool,
}

impl YamlConfigStore {
    /// Use `explicit` when given (it must then exist), otherwise
    /// `<project_root>/.kitchen-ssh.yml` if present.
    #[must_use]
    pub fn locate(explicit: Option<PathBuf>, project_root: &Path) -> Self {
        match explicit {
            Some(path) => Self {
                path,
                required: true,
            },
            None => Self {
                path: project_root.join(CONFIG_FILE),
                required: false,
            },
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file. Relative provisioner paths are resolved
    /// against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing or any file cannot be
    /// read or parsed.
    pub fn load(&self) -> Result<KitchenConfig> {
        if !self.path.exists() {
            anyhow::ensure!(
                !self.required,
                "config file {} does not exist",
                self.path.display()
            );
            return Ok(KitchenConfig::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("cannot read {}", self.path.display()))?;
        let mut config: KitchenConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("cannot parse {}", self.path.display()))?;

        if let Some(base) = self.path.parent() {
            let provisioner = &mut config.provisioner;
            if provisioner.script.is_relative() {
                provisioner.script = base.join(&provisioner.script);
            }
            if let Some(data) = &provisioner.data_path
                && data.is_relative()
            {
                provisioner.data_path = Some(base.join(data));
            }
        }
        tracing::debug!(path = %self.path.display(), "loaded config");
        Ok(config)
    }
}
