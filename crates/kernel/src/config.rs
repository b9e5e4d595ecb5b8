//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to plugins directory (default: ./plugins).
    pub plugins_dir: PathBuf,

    /// File holding the explicitly enabled plugins (default: ./enabled_plugins.toml).
    pub enabled_plugins_file: PathBuf,

    /// Node to query and update, `host:port` or URL (default: 127.0.0.1:3000).
    pub node: String,

    /// Wait between progress ticks while a node applies a change (default: 1000 ms).
    pub apply_poll_interval: Duration,

    /// Timeout for liveness and active-plugin queries (default: 2000 ms).
    pub node_probe_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let plugins_dir = lookup("PLUGINS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./plugins"));

        let enabled_plugins_file = lookup("ENABLED_PLUGINS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./enabled_plugins.toml"));

        let node = lookup("PLUGSYNC_NODE").unwrap_or_else(|| "127.0.0.1:3000".to_string());

        let apply_poll_interval_ms: u64 = lookup("APPLY_POLL_INTERVAL_MS")
            .unwrap_or_else(|| "1000".to_string())
            .parse()
            .context("APPLY_POLL_INTERVAL_MS must be a valid u64")?;
        if apply_poll_interval_ms == 0 {
            anyhow::bail!("APPLY_POLL_INTERVAL_MS must be greater than zero");
        }

        let node_probe_timeout_ms: u64 = lookup("NODE_PROBE_TIMEOUT_MS")
            .unwrap_or_else(|| "2000".to_string())
            .parse()
            .context("NODE_PROBE_TIMEOUT_MS must be a valid u64")?;
        if node_probe_timeout_ms == 0 {
            anyhow::bail!("NODE_PROBE_TIMEOUT_MS must be greater than zero");
        }

        Ok(Self {
            plugins_dir,
            enabled_plugins_file,
            node,
            apply_poll_interval: Duration::from_millis(apply_poll_interval_ms),
            node_probe_timeout: Duration::from_millis(node_probe_timeout_ms),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.plugins_dir, PathBuf::from("./plugins"));
        assert_eq!(
            config.enabled_plugins_file,
            PathBuf::from("./enabled_plugins.toml")
        );
        assert_eq!(config.node, "127.0.0.1:3000");
        assert_eq!(config.apply_poll_interval, Duration::from_secs(1));
        assert_eq!(config.node_probe_timeout, Duration::from_secs(2));
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PLUGINS_DIR", "/opt/plugins"),
            ("PLUGSYNC_NODE", "node-7:8080"),
            ("APPLY_POLL_INTERVAL_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.plugins_dir, PathBuf::from("/opt/plugins"));
        assert_eq!(config.node, "node-7:8080");
        assert_eq!(config.apply_poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = Config::from_lookup(lookup(&[("NODE_PROBE_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("NODE_PROBE_TIMEOUT_MS"));

        let err = Config::from_lookup(lookup(&[("APPLY_POLL_INTERVAL_MS", "0")])).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));

        let err = Config::from_lookup(lookup(&[("NODE_PROBE_TIMEOUT_MS", "0")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "NODE_PROBE_TIMEOUT_MS must be greater than zero"
        );
    }
}
