//! Persisted plugin enablement.
//!
//! Tracks which plugins have been explicitly enabled. Implicitly enabled
//! plugins are never stored; they are derived from the catalog on every run.
//!
//! The on-disk format is a small TOML document:
//!
//! ```toml
//! plugins = ["blog", "search"]
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::PluginError;
use super::set::PluginSet;

/// Storage for the explicitly enabled plugin set.
///
/// A failed write must leave the previously stored set readable.
pub trait StateStore {
    /// Read the stored set. A store that was never written reads as empty.
    fn read_enabled(&self) -> Result<PluginSet, PluginError>;

    /// Replace the stored set.
    fn write_enabled(&self, enabled: &PluginSet) -> Result<(), PluginError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EnabledFile {
    #[serde(default)]
    plugins: PluginSet,
}

/// File-backed [`StateStore`].
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write to a sibling temp file and rename it over the target.
    fn write_atomic(&self, contents: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let result = (|| {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
            std::fs::rename(&tmp_path, &self.path)
        })();

        if result.is_err() {
            let _ = std::fs::remove_file(&tmp_path);
        }
        result
    }
}

impl StateStore for FileStateStore {
    fn read_enabled(&self) -> Result<PluginSet, PluginError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no enabled plugins file, treating as empty");
                return Ok(PluginSet::new());
            }
            Err(e) => {
                return Err(PluginError::StateUnreadable {
                    path: self.path.clone(),
                    details: e.to_string(),
                });
            }
        };

        let file: EnabledFile =
            toml::from_str(&content).map_err(|e| PluginError::StateUnreadable {
                path: self.path.clone(),
                details: e.to_string(),
            })?;

        Ok(file.plugins)
    }

    fn write_enabled(&self, enabled: &PluginSet) -> Result<(), PluginError> {
        let file = EnabledFile {
            plugins: enabled.clone(),
        };
        let contents = toml::to_string(&file).map_err(|e| {
            PluginError::persistence_failed(&self.path, std::io::Error::other(e))
        })?;

        self.write_atomic(&contents)
            .map_err(|e| PluginError::persistence_failed(&self.path, e))?;

        debug!(path = %self.path.display(), count = enabled.len(), "wrote enabled plugins");
        Ok(())
    }
}
