//! Plugin enable/disable reconciliation.
//!
//! Given the catalog, the stored explicit set and what a node reports as
//! running, works out the new explicit set and which plugins change state.
//!
//! Planning ([`plan_enable`], [`plan_disable`]) is pure. [`Reconciler`] adds
//! the stored state on either side: it reads the explicit set, plans, and
//! writes the result before handing back the outcome, so the durable record
//! is always updated before anything is sent to a live node.

use tracing::{debug, info};

use super::catalog::Catalog;
use super::dependency::{Direction, closure};
use super::error::PluginError;
use super::node::ActiveState;
use super::set::PluginSet;
use super::status::StateStore;

/// What a request changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Nothing to report and nothing to send to the node.
    Unchanged,
    Changed {
        /// Plugins whose enabled state changed, for reporting.
        delta: PluginSet,
        /// Plugins to enable or disable on the live node.
        apply: PluginSet,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnableOutcome {
    /// The explicit set to store.
    pub explicit: PluginSet,
    /// Dependencies pulled in by the explicit set.
    pub implicit: PluginSet,
    pub change: Change,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisableOutcome {
    /// The explicit set to store.
    pub explicit: PluginSet,
    /// Requested names that are not in the catalog. Reported, not fatal.
    pub unknown: PluginSet,
    pub change: Change,
}

/// Trim and de-duplicate the requested names; an empty request is invalid.
fn requested_set(requested: &[String], action: &'static str) -> Result<PluginSet, PluginError> {
    let names: PluginSet = requested
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .collect();

    if names.is_empty() {
        return Err(PluginError::InvalidRequest { action });
    }
    Ok(names)
}

/// Plan an enable request.
///
/// Fails if a requested plugin or anything it transitively needs is missing
/// from the catalog, or if the node is unreachable and `offline` is false.
pub fn plan_enable(
    requested: &[String],
    explicit: &PluginSet,
    catalog: &Catalog,
    active: &ActiveState,
    offline: bool,
) -> Result<EnableOutcome, PluginError> {
    let requested = requested_set(requested, "enable")?;
    let available = catalog.names();

    let enabled_before = closure(Direction::Dependencies, explicit, catalog);
    let new_explicit = explicit.union(&requested);
    let enabled_after = closure(Direction::Dependencies, &new_explicit, catalog);
    let implicit_after = enabled_after.difference(&new_explicit);

    let missing_plugins = requested.difference(&available);
    let missing_deps = implicit_after
        .difference(&available)
        .difference(&missing_plugins);
    if let Some(err) = PluginError::missing(missing_plugins, missing_deps) {
        return Err(err);
    }

    let delta = enabled_after.difference(&enabled_before);

    let apply = match active {
        ActiveState::Reachable(running) => enabled_after.difference(running),
        ActiveState::Unreachable { .. } if offline => delta.clone(),
        ActiveState::Unreachable { node } => return Err(PluginError::node_unreachable(node)),
    };

    let change = if delta.is_empty() {
        Change::Unchanged
    } else {
        Change::Changed { delta, apply }
    };

    Ok(EnableOutcome {
        explicit: new_explicit,
        implicit: implicit_after,
        change,
    })
}

/// Plan a disable request.
///
/// Disabling a plugin also disables everything that depends on it. Unknown
/// names are collected into [`DisableOutcome::unknown`] rather than failing.
pub fn plan_disable(
    requested: &[String],
    explicit: &PluginSet,
    catalog: &Catalog,
    active: &ActiveState,
    offline: bool,
) -> Result<DisableOutcome, PluginError> {
    let requested = requested_set(requested, "disable")?;
    let unknown = requested.difference(&catalog.names());

    let to_disable = closure(Direction::Dependents, &requested, catalog);
    let new_explicit = explicit.difference(&to_disable);

    // Offline, the stored configuration stands in for what the node runs.
    let running = match active {
        ActiveState::Reachable(running) => running.clone(),
        ActiveState::Unreachable { .. } if offline => {
            closure(Direction::Dependencies, explicit, catalog)
        }
        ActiveState::Unreachable { node } => return Err(PluginError::node_unreachable(node)),
    };

    // Compares sizes only; see DESIGN.md.
    let change = if running.len() == new_explicit.len() {
        Change::Unchanged
    } else {
        let enabled_before = closure(Direction::Dependencies, &running, catalog);
        let enabled_after = closure(Direction::Dependencies, &new_explicit, catalog);
        let delta = enabled_before.difference(&enabled_after);
        Change::Changed {
            apply: delta.clone(),
            delta,
        }
    };

    Ok(DisableOutcome {
        explicit: new_explicit,
        unknown,
        change,
    })
}

/// Runs enable/disable requests against a catalog and a state store.
pub struct Reconciler<'a> {
    catalog: &'a Catalog,
    store: &'a dyn StateStore,
    offline: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(catalog: &'a Catalog, store: &'a dyn StateStore) -> Self {
        Self {
            catalog,
            store,
            offline: false,
        }
    }

    /// Allow proceeding when the node cannot be contacted.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Enable `requested` and store the new explicit set.
    ///
    /// The set is stored even when nothing changed.
    pub fn enable(
        &self,
        requested: &[String],
        active: &ActiveState,
    ) -> Result<EnableOutcome, PluginError> {
        let explicit = self.store.read_enabled()?;
        let outcome = plan_enable(requested, &explicit, self.catalog, active, self.offline)?;

        self.store.write_enabled(&outcome.explicit)?;

        match &outcome.change {
            Change::Unchanged => debug!(?requested, "enable left configuration unchanged"),
            Change::Changed { delta, .. } => info!(enabled = %delta, "plugins enabled"),
        }
        Ok(outcome)
    }

    /// Disable `requested` and their dependents, storing the new explicit
    /// set when anything changed.
    pub fn disable(
        &self,
        requested: &[String],
        active: &ActiveState,
    ) -> Result<DisableOutcome, PluginError> {
        let explicit = self.store.read_enabled()?;
        let outcome = plan_disable(requested, &explicit, self.catalog, active, self.offline)?;

        match &outcome.change {
            Change::Unchanged => debug!(?requested, "disable left configuration unchanged"),
            Change::Changed { delta, .. } => {
                self.store.write_enabled(&outcome.explicit)?;
                info!(disabled = %delta, "plugins disabled");
            }
        }
        Ok(outcome)
    }
}
