//! Domain layer: pure types, validation, and connection resolution.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod connection;
pub mod error;
pub mod state;

pub use config::{
    DriverConfig, KeyMaterial, KitchenConfig, ShellProvisionerConfig, ShellVerifierConfig,
};
pub use connection::{ConnectionDescriptor, ConnectionOptions, resolve};
pub use error::{DriverError, StateError};
pub use state::{RuntimeState, validate_instance_name};
