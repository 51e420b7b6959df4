//! Command implementations

pub mod converge;
pub mod create;
pub mod destroy;
pub mod exec;
pub mod login;
pub mod setup;
pub mod verify;
pub mod wait;
