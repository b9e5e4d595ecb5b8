//! Plugin management error types with clear, actionable messages.
//!
//! Every expected failure of a reconciliation request is one of these
//! variants. None of them leave a partially written enablement file behind.

use std::path::PathBuf;

use thiserror::Error;

use super::set::PluginSet;

/// Errors that abort a plugin list, enable or disable request.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The request named no plugins.
    #[error("specify at least one plugin to {action}")]
    InvalidRequest { action: &'static str },

    /// Requested plugins are not in the catalog.
    #[error("the following plugins could not be found: {plugins}")]
    MissingPlugins { plugins: PluginSet },

    /// Requested plugins exist but something they need does not.
    #[error("the following plugins required as dependencies could not be found: {dependencies}")]
    MissingDependencies { dependencies: PluginSet },

    /// Both of the above at once.
    #[error(
        "the following plugins could not be found: {plugins}; \
         the following plugins required as dependencies could not be found: {dependencies}"
    )]
    MissingPluginsAndDependencies {
        plugins: PluginSet,
        dependencies: PluginSet,
    },

    /// The node could not be contacted and offline mode was not requested.
    #[error("unable to contact {node}; retry with --offline to change the configuration anyway")]
    NodeUnreachable { node: String },

    /// The enablement file could not be written.
    #[error("failed to write enabled plugins file {}: {source}", path.display())]
    PersistenceFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The enablement file exists but could not be read back as a list of names.
    #[error("failed to read enabled plugins file {}: {details}", path.display())]
    StateUnreadable { path: PathBuf, details: String },

    /// The plugins directory could not be scanned.
    #[error("failed to read plugins directory {}: {source}", path.display())]
    CatalogUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The `list` pattern is not a valid regular expression.
    #[error("invalid plugin name pattern '{pattern}': {details}")]
    InvalidPattern { pattern: String, details: String },

    /// The node answered a status query with an application error.
    #[error("{node} returned an error while listing active plugins: {payload}")]
    Node { node: String, payload: String },
}

impl PluginError {
    /// Build the right missing-plugin variant for the two sets, or `None`
    /// when nothing is missing.
    pub fn missing(plugins: PluginSet, dependencies: PluginSet) -> Option<Self> {
        match (plugins.is_empty(), dependencies.is_empty()) {
            (true, true) => None,
            (false, true) => Some(Self::MissingPlugins { plugins }),
            (true, false) => Some(Self::MissingDependencies { dependencies }),
            (false, false) => Some(Self::MissingPluginsAndDependencies {
                plugins,
                dependencies,
            }),
        }
    }

    /// Create a node unreachable error.
    pub fn node_unreachable(node: impl Into<String>) -> Self {
        Self::NodeUnreachable { node: node.into() }
    }

    /// Create a persistence failure.
    pub fn persistence_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PersistenceFailed {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> PluginSet {
        names.iter().copied().collect()
    }

    #[test]
    fn missing_picks_variant() {
        assert!(PluginError::missing(PluginSet::new(), PluginSet::new()).is_none());

        let err = PluginError::missing(set(&["x"]), PluginSet::new()).unwrap();
        assert!(matches!(err, PluginError::MissingPlugins { .. }));

        let err = PluginError::missing(PluginSet::new(), set(&["y"])).unwrap();
        assert!(matches!(err, PluginError::MissingDependencies { .. }));

        let err = PluginError::missing(set(&["x"]), set(&["y"])).unwrap();
        let msg = err.to_string();
        assert!(msg.contains("could not be found: x"));
        assert!(msg.contains("dependencies could not be found: y"));
    }

    #[test]
    fn unreachable_suggests_offline() {
        let msg = PluginError::node_unreachable("node-1:3000").to_string();
        assert!(msg.contains("node-1:3000"));
        assert!(msg.contains("--offline"));
    }

    #[test]
    fn persistence_failure_names_file() {
        let err = PluginError::persistence_failed(
            "/etc/plugsync/enabled_plugins.toml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("enabled_plugins.toml"));
        assert!(msg.contains("denied"));
    }
}
