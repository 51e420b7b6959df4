//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! OpenSSH transport, archive creation, the shell provisioner and verifier,
//! and YAML/JSON persistence.
//!
//! Imports from `crate::domain` and `crate::application` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod backend;
pub mod command_runner;
pub mod compression;
pub mod config;
pub mod openssh;
pub mod provisioner;
pub mod state;
pub mod verifier;
