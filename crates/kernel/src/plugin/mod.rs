//! Plugin enablement for Plugsync.
//!
//! This module handles:
//! - Parsing plugin metadata from `.info.toml` files and building the catalog
//! - Resolving dependency closures in both directions
//! - Persisting the explicitly enabled set
//! - Reconciling enable/disable requests against a live node
//! - Applying changes to a running node with progress reporting

mod apply;
mod catalog;
pub mod cli;
mod dependency;
mod error;
mod info_parser;
mod node;
mod reconcile;
mod set;
mod status;

pub use apply::{ApplyAction, ApplyOutcome, ApplyState, DEFAULT_TICK, LiveApply};
pub use catalog::Catalog;
pub use dependency::{Direction, closure};
pub use error::PluginError;
pub use info_parser::PluginInfo;
pub use node::{ActiveState, HttpNodeClient, NodeClient, NodeError, PluginList};
pub use reconcile::{
    Change, DisableOutcome, EnableOutcome, Reconciler, plan_disable, plan_enable,
};
pub use set::PluginSet;
pub use status::{FileStateStore, StateStore};
