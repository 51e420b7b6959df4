//! Shared test doubles for the lifecycle services.
//!
//! Every fake writes into one [`Journal`] so tests can assert the exact order
//! of transport, compressor and provisioner calls.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::application::ports::{
    Archive, Compressor, InstanceBackend, LoginCommand, Provisioner, RemoteSession, TestTool,
    Transport,
};
use crate::domain::ConnectionDescriptor;

/// Ordered, shared log of fake calls.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().expect("journal poisoned").push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().expect("journal poisoned").clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

// ── Session / transport ─────────────────────────────────────────────────────

pub struct RecordingSession {
    journal: Journal,
    fail_on: Option<String>,
}

impl RecordingSession {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            fail_on: None,
        }
    }

    /// Fail any exec or upload whose description contains `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    fn check(&self, what: &str) -> Result<()> {
        if let Some(needle) = &self.fail_on
            && what.contains(needle.as_str())
        {
            anyhow::bail!("{what}");
        }
        Ok(())
    }
}

impl RemoteSession for RecordingSession {
    async fn exec(&self, command: &str) -> Result<()> {
        self.journal.push(format!("exec {command}"));
        self.check(&format!("exec failed: {command}"))
    }

    async fn upload(&self, local: &Path, remote_dir: &str) -> Result<()> {
        let event = format!("upload {} -> {remote_dir}", display_name(local));
        self.journal.push(event.clone());
        self.check(&event)
    }

    async fn close(self) -> Result<()> {
        self.journal.push("close");
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTransport {
    pub journal: Journal,
    pub fail_on: Option<String>,
    pub refuse_connections: bool,
}

impl FakeTransport {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            ..Self::default()
        }
    }
}

impl Transport for FakeTransport {
    type Session = RecordingSession;

    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<RecordingSession> {
        self.journal.push(format!("open {}", descriptor.target()));
        if self.refuse_connections {
            anyhow::bail!("connection refused");
        }
        let session = RecordingSession::new(&self.journal);
        Ok(match &self.fail_on {
            Some(needle) => session.failing_on(needle),
            None => session,
        })
    }

    async fn wait_until_ready(&self, descriptor: &ConnectionDescriptor) -> Result<()> {
        self.journal.push(format!("wait {}", descriptor.target()));
        if self.refuse_connections {
            anyhow::bail!("timed out");
        }
        Ok(())
    }

    fn login_command(&self, descriptor: &ConnectionDescriptor) -> LoginCommand {
        LoginCommand {
            program: "ssh".to_string(),
            args: vec![descriptor.target()],
        }
    }
}

// ── Compressor ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeCompressor {
    pub journal: Journal,
    pub supports: Vec<PathBuf>,
    pub unpack: Option<String>,
    pub fail: bool,
    /// Path of the most recent archive, to check it was cleaned up.
    pub last_archive: Mutex<Option<PathBuf>>,
}

impl FakeCompressor {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            ..Self::default()
        }
    }
}

impl Compressor for FakeCompressor {
    fn name(&self) -> &str {
        "fake"
    }

    fn supports(&self) -> Vec<PathBuf> {
        self.supports.clone()
    }

    fn compress(&self, paths: &[PathBuf]) -> Result<Archive> {
        let names: Vec<String> = paths.iter().map(|p| display_name(p)).collect();
        self.journal.push(format!("compress {}", names.join(",")));
        if self.fail {
            anyhow::bail!("disk full");
        }
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("payload.fake"), b"payload")?;
        let archive = Archive::in_temp_dir(dir, "payload.fake");
        *self.last_archive.lock().expect("poisoned") = Some(archive.path().to_path_buf());
        Ok(archive)
    }

    fn unpack_command(&self, file_name: &str) -> Option<String> {
        self.unpack.as_ref().map(|u| format!("{u} {file_name}"))
    }
}

// ── Provisioner / test tool / backend ──────────────────────────────────────

#[derive(Default)]
pub struct FakeProvisioner {
    pub journal: Journal,
    pub sandbox: Option<tempfile::TempDir>,
    pub fail_create: bool,
    pub fail_cleanup: bool,
    pub root: String,
    pub install: Option<String>,
    pub init: Option<String>,
    pub prepare: Option<String>,
    pub run: Option<String>,
}

impl FakeProvisioner {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            root: "/tmp/kitchen".to_string(),
            install: Some("install.sh".to_string()),
            init: Some("init.sh".to_string()),
            prepare: Some("prepare.sh".to_string()),
            run: Some("run.sh".to_string()),
            ..Self::default()
        }
    }
}

impl Provisioner for FakeProvisioner {
    fn sandbox_path(&self) -> Option<&Path> {
        self.sandbox.as_ref().map(tempfile::TempDir::path)
    }

    fn root_path(&self) -> &str {
        &self.root
    }

    fn install_command(&self) -> Option<String> {
        self.install.clone()
    }

    fn init_command(&self) -> Option<String> {
        self.init.clone()
    }

    fn prepare_command(&self) -> Option<String> {
        self.prepare.clone()
    }

    fn run_command(&self) -> Option<String> {
        self.run.clone()
    }

    async fn create_sandbox(&mut self) -> Result<()> {
        self.journal.push("create_sandbox");
        if self.fail_create {
            anyhow::bail!("script not found");
        }
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("bootstrap.sh"), b"#!/bin/sh\n")?;
        std::fs::create_dir(dir.path().join("data"))?;
        self.sandbox = Some(dir);
        Ok(())
    }

    async fn cleanup_sandbox(&mut self) -> Result<()> {
        self.journal.push("cleanup_sandbox");
        self.sandbox = None;
        if self.fail_cleanup {
            anyhow::bail!("sandbox busy");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTestTool {
    pub setup: Option<String>,
    pub sync: Option<String>,
    pub run: Option<String>,
}

impl TestTool for FakeTestTool {
    fn setup_command(&self) -> Option<String> {
        self.setup.clone()
    }

    fn sync_command(&self) -> Option<String> {
        self.sync.clone()
    }

    fn run_command(&self) -> Option<String> {
        self.run.clone()
    }
}

/// Backend that relies on the trait's default methods.
pub struct BareBackend;

impl InstanceBackend for BareBackend {}
