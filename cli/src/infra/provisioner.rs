//! Shell provisioner: ships one script (plus an optional data directory) and
//! runs it on the instance.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::Provisioner;
use crate::domain::{DriverConfig, ShellProvisionerConfig};

/// Name the script is stored under inside the sandbox.
pub const SCRIPT_NAME: &str = "bootstrap.sh";

pub struct ShellProvisioner {
    config: ShellProvisionerConfig,
    driver: DriverConfig,
    sandbox: Option<tempfile::TempDir>,
}

impl ShellProvisioner {
    #[must_use]
    pub fn new(config: ShellProvisionerConfig, driver: &DriverConfig) -> Self {
        Self {
            config,
            driver: driver.clone(),
            sandbox: None,
        }
    }
}

/// Copy regular files and directories from `src` into `dst`. Symlinks are skipped.
fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst).with_context(|| format!("creating {}", dst.display()))?;
    for entry in std::fs::read_dir(src).with_context(|| format!("reading {}", src.display()))? {
        let entry = entry.with_context(|| format!("reading {}", src.display()))?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("inspecting {}", entry.path().display()))?;
        let target = dst.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else if file_type.is_file() {
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("copying {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// Assemble a fresh sandbox holding the script and the optional data tree.
fn build_sandbox(config: &ShellProvisionerConfig) -> Result<tempfile::TempDir> {
    let dir = tempfile::Builder::new()
        .prefix("kitchen-sandbox-")
        .tempdir()
        .context("creating sandbox directory")?;

    let script = dir.path().join(SCRIPT_NAME);
    std::fs::copy(&config.script, &script)
        .with_context(|| format!("copying script {}", config.script.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("setting permissions on {}", script.display()))?;
    }

    if let Some(data) = &config.data_path {
        copy_dir_all(data, &dir.path().join("data"))?;
    }
    Ok(dir)
}

impl Provisioner for ShellProvisioner {
    fn sandbox_path(&self) -> Option<&Path> {
        self.sandbox.as_ref().map(tempfile::TempDir::path)
    }

    fn root_path(&self) -> &str {
        &self.config.root_path
    }

    fn install_command(&self) -> Option<String> {
        None
    }

    fn init_command(&self) -> Option<String> {
        let root = &self.config.root_path;
        Some(format!(
            "{} && mkdir -p {root}",
            self.driver.sudo_command(&format!("rm -rf {root}"))
        ))
    }

    fn prepare_command(&self) -> Option<String> {
        None
    }

    fn run_command(&self) -> Option<String> {
        Some(
            self.driver
                .sudo_command(&format!("sh {}/{SCRIPT_NAME}", self.config.root_path)),
        )
    }

    async fn create_sandbox(&mut self) -> Result<()> {
        self.cleanup_sandbox().await?;
        let config = self.config.clone();
        let dir = tokio::task::spawn_blocking(move || build_sandbox(&config))
            .await
            .context("spawn_blocking for sandbox creation")??;

        tracing::debug!(sandbox = %dir.path().display(), "sandbox created");
        self.sandbox = Some(dir);
        Ok(())
    }

    async fn cleanup_sandbox(&mut self) -> Result<()> {
        let Some(dir) = self.sandbox.take() else {
            return Ok(());
        };
        let shown = dir.path().display().to_string();
        tokio::task::spawn_blocking(move || dir.close())
            .await
            .context("spawn_blocking for sandbox cleanup")?
            .with_context(|| format!("removing sandbox {shown}"))
    }
}
