//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`: never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::{Context, Result};

use crate::domain::{ConnectionDescriptor, DriverError, RuntimeState};

// ── Value Types ───────────────────────────────────────────────────────────────

/// An interactive login invocation, e.g. `ssh -p 22 vagrant@10.0.0.5`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for LoginCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// Quote `arg` for a POSIX shell when it is not made of safe characters only.
fn shell_quote(arg: &str) -> Cow<'_, str> {
    let safe = |c: char| c.is_ascii_alphanumeric() || "-_./=:@%+,".contains(c);
    if !arg.is_empty() && arg.chars().all(safe) {
        Cow::Borrowed(arg)
    } else {
        Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
    }
}

/// A compressed payload produced by a [`Compressor`].
///
/// The archive file lives only as long as this value is not cleaned up. The
/// transfer pipeline calls [`Archive::cleanup`] once the upload has finished
/// or failed; it never holds on to the path afterwards.
#[derive(Debug)]
pub struct Archive {
    path: PathBuf,
    dir: Option<tempfile::TempDir>,
}

impl Archive {
    /// An archive stored inside a temporary directory that is removed on cleanup.
    #[must_use]
    pub fn in_temp_dir(dir: tempfile::TempDir, file_name: &str) -> Self {
        Self {
            path: dir.path().join(file_name),
            dir: Some(dir),
        }
    }

    /// An archive the compressor does not own (nothing is deleted on cleanup).
    #[must_use]
    pub fn borrowed(path: PathBuf) -> Self {
        Self { path, dir: None }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base filename of the archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the path has no UTF-8 file name component.
    pub fn file_name(&self) -> Result<&str> {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("archive path {} has no file name", self.path.display()))
    }

    /// Delete the archive and its temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be removed.
    pub fn cleanup(self) -> Result<()> {
        if let Some(dir) = self.dir {
            let shown = dir.path().display().to_string();
            dir.close()
                .with_context(|| format!("removing archive dir {shown}"))?;
        }
        Ok(())
    }
}

// ── Transport Ports ───────────────────────────────────────────────────────────

/// An open remote-shell session. Closed explicitly by the driver.
#[allow(async_fn_in_trait)]
pub trait RemoteSession {
    /// Execute `command` remotely and wait for it to finish.
    ///
    /// Implementations must fail on transport errors and on a non-zero exit.
    async fn exec(&self, command: &str) -> Result<()>;
    /// Upload `local` (file or directory) into the remote directory `remote_dir`.
    async fn upload(&self, local: &Path, remote_dir: &str) -> Result<()>;
    /// Release the session.
    async fn close(self) -> Result<()>;
}

/// Remote-shell transport: opens sessions and probes readiness.
#[allow(async_fn_in_trait)]
pub trait Transport {
    type Session: RemoteSession;

    /// Connect and authenticate.
    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Self::Session>;
    /// Block until the endpoint accepts connections and authenticates.
    async fn wait_until_ready(&self, descriptor: &ConnectionDescriptor) -> Result<()>;
    /// Build the interactive login invocation. Performs no I/O.
    fn login_command(&self, descriptor: &ConnectionDescriptor) -> LoginCommand;
}

// ── Payload Ports ─────────────────────────────────────────────────────────────

/// Packs local paths into a single archive and knows how to unpack it remotely.
///
/// `compress` does blocking file I/O; callers run it on a blocking thread.
pub trait Compressor {
    /// Registry name, e.g. `"gzip"`.
    fn name(&self) -> &str;
    /// Local files that must be uploaded before the archive, in order.
    fn supports(&self) -> Vec<PathBuf>;
    /// Pack `paths` into one archive.
    ///
    /// # Errors
    ///
    /// Returns an error if a path cannot be read or the archive cannot be written.
    fn compress(&self, paths: &[PathBuf]) -> Result<Archive>;
    /// Remote command that unpacks `file_name` in the current directory, or
    /// `None` when the archive is used as-is.
    fn unpack_command(&self, file_name: &str) -> Option<String>;
}

/// Builds the local sandbox shipped during converge and names the remote
/// commands that install and run it.
#[allow(async_fn_in_trait)]
pub trait Provisioner {
    /// Local sandbox directory, once created.
    fn sandbox_path(&self) -> Option<&Path>;
    /// Remote directory the sandbox is delivered to.
    fn root_path(&self) -> &str;
    fn install_command(&self) -> Option<String>;
    fn init_command(&self) -> Option<String>;
    fn prepare_command(&self) -> Option<String>;
    fn run_command(&self) -> Option<String>;
    /// Materialize the local sandbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the sandbox cannot be assembled.
    async fn create_sandbox(&mut self) -> Result<()>;
    /// Release the local sandbox. Must succeed when no sandbox exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the sandbox exists but cannot be removed.
    async fn cleanup_sandbox(&mut self) -> Result<()>;
}

/// Remote test runner used by `setup` and `verify`. Commands are opaque.
pub trait TestTool {
    fn setup_command(&self) -> Option<String>;
    fn sync_command(&self) -> Option<String>;
    fn run_command(&self) -> Option<String>;
}

// ── Backend Port ──────────────────────────────────────────────────────────────

/// Brings instances into existence and tears them down.
///
/// Both methods default to [`DriverError::NotImplemented`] naming the
/// implementing type, so a backend that forgets one fails loudly.
#[allow(async_fn_in_trait)]
pub trait InstanceBackend {
    /// Provision an instance and record how to reach it in `state`.
    async fn create(&self, _state: &mut RuntimeState) -> Result<(), DriverError> {
        Err(DriverError::NotImplemented {
            backend: std::any::type_name::<Self>(),
            action: "create",
        })
    }

    /// Tear the instance down and clear `state`.
    async fn destroy(&self, _state: &mut RuntimeState) -> Result<(), DriverError> {
        Err(DriverError::NotImplemented {
            backend: std::any::type_name::<Self>(),
            action: "destroy",
        })
    }
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts local process execution so the OpenSSH transport can be tested
/// without spawning `ssh`.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program with the runner's default timeout and capture its output.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<Output>;
    /// Run a program with extra environment variables.
    ///
    /// `timeout` of `None` uses the runner's default. Secrets belong here,
    /// never in `args`, which any local user can read from the process table.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds the timeout.
    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
        timeout: Option<std::time::Duration>,
    ) -> Result<Output>;
    /// Run a program with inherited stdio and return its exit status.
    async fn run_status(&self, program: &str, args: &[&str]) -> Result<std::process::ExitStatus>;
}

// ── State Port ────────────────────────────────────────────────────────────────

/// Persists runtime state between invocations.
#[allow(async_fn_in_trait)]
pub trait StateStore {
    /// Load the state, returning `None` if the instance was never created.
    async fn load(&self) -> Result<Option<RuntimeState>>;
    async fn save(&self, state: &RuntimeState) -> Result<()>;
    /// Forget the instance.
    async fn clear(&self) -> Result<()>;
}
