//! Parser for plugin `.info.toml` manifest files.
//!
//! Each plugin directory carries a single `{name}.info.toml` file that
//! declares:
//! - name (required), version and description (optional)
//! - dependencies (other plugins that must be enabled alongside it)

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Plugin metadata parsed from `.info.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PluginInfo {
    /// Plugin machine name, unique within a catalog.
    pub name: String,

    /// Opaque version string as published by the plugin.
    #[serde(default)]
    pub version: Option<String>,

    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,

    /// Plugins this one requires. May name plugins that are not installed.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl PluginInfo {
    /// Build an entry in memory, e.g. for tests or a remote catalog.
    pub fn new(name: impl Into<String>, dependencies: &[&str]) -> Self {
        Self {
            name: name.into(),
            version: None,
            description: None,
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        }
    }

    /// Parse a plugin info file from the given path.
    pub fn parse(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plugin info file: {}", path.display()))?;

        Self::parse_str(&content, path)
    }

    /// Parse plugin info from a TOML string.
    pub fn parse_str(content: &str, path: &Path) -> Result<Self> {
        let info: PluginInfo = toml::from_str(content)
            .with_context(|| format!("failed to parse plugin info TOML at {}", path.display()))?;

        info.validate(path)?;
        Ok(info)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("plugin info at {} has empty 'name' field", path.display());
        }

        if let Some(dep) = self.dependencies.iter().find(|d| d.trim().is_empty()) {
            anyhow::bail!(
                "plugin '{}' at {} lists an empty dependency name ({dep:?})",
                self.name,
                path.display()
            );
        }

        if self.dependencies.iter().any(|d| d == &self.name) {
            anyhow::bail!(
                "plugin '{}' at {} lists itself as a dependency",
                self.name,
                path.display()
            );
        }

        Ok(())
    }
}
