//! Plugin catalog discovery.
//!
//! Scans a plugins directory for subdirectories holding a `.info.toml`
//! manifest. The catalog is read fresh for every command and never cached.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::error::PluginError;
use super::info_parser::PluginInfo;
use super::set::PluginSet;

/// The plugins available for enabling, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    plugins: BTreeMap<String, PluginInfo>,
}

impl Catalog {
    /// Build a catalog from in-memory entries. Later duplicates win.
    pub fn from_plugins(plugins: impl IntoIterator<Item = PluginInfo>) -> Self {
        Self {
            plugins: plugins
                .into_iter()
                .map(|info| (info.name.clone(), info))
                .collect(),
        }
    }

    /// Discover plugins on disk.
    ///
    /// Each plugin is expected in its own subdirectory with exactly one
    /// `{name}.info.toml`. Directories without a usable manifest are logged
    /// and skipped; an unreadable plugins directory aborts discovery.
    pub fn discover(plugins_dir: &Path) -> Result<Self, PluginError> {
        let entries =
            std::fs::read_dir(plugins_dir).map_err(|source| PluginError::CatalogUnreadable {
                path: plugins_dir.to_path_buf(),
                source,
            })?;

        let mut dirs: Vec<_> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .collect();

        // Sort for deterministic duplicate handling
        dirs.sort_by_key(|e| e.file_name());

        let mut plugins = BTreeMap::new();
        for entry in dirs {
            let plugin_dir = entry.path();

            let Some(info_path) = find_manifest(&plugin_dir) else {
                continue;
            };

            match PluginInfo::parse(&info_path) {
                Ok(info) => {
                    debug!(plugin = %info.name, deps = ?info.dependencies, "discovered plugin");
                    if let Some(previous) = plugins.insert(info.name.clone(), info) {
                        warn!(
                            plugin = %previous.name,
                            dir = %plugin_dir.display(),
                            "duplicate plugin name, later directory wins"
                        );
                    }
                }
                Err(e) => {
                    warn!(path = %info_path.display(), error = %e, "failed to parse plugin info");
                }
            }
        }

        Ok(Self { plugins })
    }

    pub fn get(&self, name: &str) -> Option<&PluginInfo> {
        self.plugins.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// All plugin names in the catalog.
    pub fn names(&self) -> PluginSet {
        self.plugins.keys().cloned().collect()
    }

    /// Plugins in name order.
    pub fn iter(&self) -> impl Iterator<Item = &PluginInfo> {
        self.plugins.values()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Locate the single `.info.toml` inside a plugin directory.
fn find_manifest(plugin_dir: &Path) -> Option<PathBuf> {
    let info_files: Vec<_> = match std::fs::read_dir(plugin_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(".info.toml"))
            })
            .collect(),
        Err(e) => {
            warn!(dir = %plugin_dir.display(), error = %e, "failed to read plugin dir");
            return None;
        }
    };

    match info_files.as_slice() {
        [] => {
            warn!(dir = %plugin_dir.display(), "no .info.toml file found, skipping");
            None
        }
        [path] => Some(path.clone()),
        _ => {
            warn!(dir = %plugin_dir.display(), "multiple .info.toml files found, skipping");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn write_plugin(root: &Path, dir: &str, manifest: &str) {
        let plugin_dir = root.join(dir);
        std::fs::create_dir_all(&plugin_dir).unwrap();
        std::fs::write(plugin_dir.join(format!("{dir}.info.toml")), manifest).unwrap();
    }

    #[test]
    fn discovers_valid_plugins() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(
            tmp.path(),
            "blog",
            "name = \"blog\"\nversion = \"1.0.0\"\ndependencies = [\"item\"]\n",
        );
        write_plugin(tmp.path(), "item", "name = \"item\"\n");

        let catalog = Catalog::discover(tmp.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("blog").unwrap().dependencies, vec!["item"]);
        assert!(catalog.contains("item"));
    }

    #[test]
    fn skips_broken_and_empty_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(tmp.path(), "good", "name = \"good\"\n");
        write_plugin(tmp.path(), "bad", "name = [not toml");
        std::fs::create_dir_all(tmp.path().join("empty")).unwrap();
        std::fs::write(tmp.path().join("stray.info.toml"), "name = \"stray\"\n").unwrap();

        let catalog = Catalog::discover(tmp.path()).unwrap();
        assert_eq!(catalog.names(), ["good"].into_iter().collect());
    }

    #[test]
    fn skips_dir_with_two_manifests() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(tmp.path(), "twice", "name = \"twice\"\n");
        std::fs::write(tmp.path().join("twice/other.info.toml"), "name = \"other\"\n").unwrap();

        let catalog = Catalog::discover(tmp.path()).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn missing_directory_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let result = Catalog::discover(&tmp.path().join("nope"));
        assert!(matches!(
            result,
            Err(PluginError::CatalogUnreadable { .. })
        ));
    }

    #[test]
    fn names_follow_manifest_not_directory() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(tmp.path(), "dir_name", "name = \"real_name\"\n");

        let catalog = Catalog::discover(tmp.path()).unwrap();
        assert!(catalog.contains("real_name"));
        assert!(!catalog.contains("dir_name"));
    }
}
