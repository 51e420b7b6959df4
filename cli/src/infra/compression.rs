//! Built-in compressors and the name → factory registry.
//!
//! Every built-in packs the payload as a tar stream with each local path
//! stored under its base name. `gzip` additionally runs the stream through
//! flate2.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;

use crate::application::ports::{Archive, Compressor};
use crate::application::CompressorSource;
use crate::domain::DriverError;

/// Archive layout produced by [`TarCompressor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarKind {
    /// `payload.tar.gz`, unpacked with `tar -xzf`.
    Gzip,
    /// `payload.tar`, unpacked with `tar -xf`.
    Plain,
    /// `payload.tar`, left on the instance as uploaded.
    PassThrough,
}

#[derive(Debug, Clone, Copy)]
pub struct TarCompressor {
    kind: TarKind,
}

impl TarCompressor {
    #[must_use]
    pub fn new(kind: TarKind) -> Self {
        Self { kind }
    }

    fn file_name(self) -> &'static str {
        match self.kind {
            TarKind::Gzip => "payload.tar.gz",
            TarKind::Plain | TarKind::PassThrough => "payload.tar",
        }
    }
}

fn append_all<W: Write>(builder: &mut tar::Builder<W>, paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        let name = path
            .file_name()
            .with_context(|| format!("{} has no file name", path.display()))?;
        if path.is_dir() {
            builder.append_dir_all(name, path)
        } else {
            builder.append_path_with_name(path, name)
        }
        .with_context(|| format!("adding {} to archive", path.display()))?;
    }
    Ok(())
}

impl Compressor for TarCompressor {
    fn name(&self) -> &str {
        match self.kind {
            TarKind::Gzip => "gzip",
            TarKind::Plain => "tar",
            TarKind::PassThrough => "none",
        }
    }

    fn supports(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    fn compress(&self, paths: &[PathBuf]) -> Result<Archive> {
        let dir = tempfile::Builder::new()
            .prefix("kitchen-payload-")
            .tempdir()
            .context("creating archive directory")?;
        let target = dir.path().join(self.file_name());
        let file = File::create(&target)
            .with_context(|| format!("creating {}", target.display()))?;

        if self.kind == TarKind::Gzip {
            let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
            append_all(&mut builder, paths)?;
            builder
                .into_inner()
                .context("finishing tar stream")?
                .finish()
                .context("finishing gzip stream")?;
        } else {
            let mut builder = tar::Builder::new(file);
            append_all(&mut builder, paths)?;
            builder.finish().context("finishing tar stream")?;
        }

        Ok(Archive::in_temp_dir(dir, self.file_name()))
    }

    fn unpack_command(&self, file_name: &str) -> Option<String> {
        match self.kind {
            TarKind::Gzip => Some(format!("tar -xzf {file_name}")),
            TarKind::Plain => Some(format!("tar -xf {file_name}")),
            TarKind::PassThrough => None,
        }
    }
}

// ── Registry ─────────────────────────────────────────────────────────────────

type Factory = Box<dyn Fn() -> Box<dyn Compressor + Send + Sync> + Send + Sync>;

/// Maps compression names to compressor factories.
pub struct CompressorRegistry {
    factories: BTreeMap<String, Factory>,
}

impl CompressorRegistry {
    /// A registry with nothing registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry holding `gzip`, `tar` and `none`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for kind in [TarKind::Gzip, TarKind::Plain, TarKind::PassThrough] {
            let compressor = TarCompressor::new(kind);
            registry.register(compressor.name().to_string(), move || Box::new(compressor));
        }
        registry
    }

    /// Register (or replace) the factory for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Compressor + Send + Sync> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl Default for CompressorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl CompressorSource for CompressorRegistry {
    fn build(&self, name: &str) -> Result<Box<dyn Compressor + Send + Sync>, DriverError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| DriverError::UnknownCompressor {
                name: name.to_string(),
                valid: self.names().join(", "),
            })
    }
}
