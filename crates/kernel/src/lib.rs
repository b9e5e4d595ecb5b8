//! Plugsync Kernel Library
//!
//! Plugin enablement reconciliation for service nodes. This library exposes
//! the reconciler and its collaborators for integration testing; the command
//! line entry point is the `plugsync` binary.

pub mod args;
pub mod config;
pub mod error;
pub mod plugin;

pub use config::Config;
pub use error::{AppError, AppResult};
