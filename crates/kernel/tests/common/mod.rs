#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Provides in-memory stand-ins for the state store and the node so that
//! command flows can be exercised without a running node. The catalog is
//! always a real directory of `.info.toml` files.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use plugsync_kernel::plugin::cli::PluginContext;
use plugsync_kernel::plugin::{
    ApplyAction, LiveApply, NodeClient, NodeError, PluginError, PluginSet, StateStore,
};

pub fn set(names: &[&str]) -> PluginSet {
    names.iter().copied().collect()
}

pub fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Write a plugin manifest under `root/{name}/{name}.info.toml`.
pub fn write_plugin(root: &Path, name: &str, version: &str, deps: &[&str]) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    let deps = deps
        .iter()
        .map(|d| format!("\"{d}\""))
        .collect::<Vec<_>>()
        .join(", ");
    std::fs::write(
        dir.join(format!("{name}.info.toml")),
        format!(
            "name = \"{name}\"\nversion = \"{version}\"\n\
             description = \"The {name} plugin\"\ndependencies = [{deps}]\n"
        ),
    )
    .unwrap();
}

/// Catalog `a <- b <- c` on disk.
pub fn chain_catalog() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_plugin(dir.path(), "a", "1.0.0", &[]);
    write_plugin(dir.path(), "b", "1.0.0", &["a"]);
    write_plugin(dir.path(), "c", "2.1.0", &["b"]);
    dir
}

/// [`StateStore`] held in memory, counting writes.
#[derive(Default)]
pub struct MemoryStore {
    enabled: Mutex<PluginSet>,
    writes: Mutex<usize>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn with(enabled: PluginSet) -> Self {
        Self {
            enabled: Mutex::new(enabled),
            ..Default::default()
        }
    }

    pub fn failing(enabled: PluginSet) -> Self {
        Self {
            enabled: Mutex::new(enabled),
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn enabled(&self) -> PluginSet {
        self.enabled.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl StateStore for MemoryStore {
    fn read_enabled(&self) -> Result<PluginSet, PluginError> {
        Ok(self.enabled.lock().unwrap().clone())
    }

    fn write_enabled(&self, enabled: &PluginSet) -> Result<(), PluginError> {
        if self.fail_writes {
            return Err(PluginError::persistence_failed(
                "memory",
                std::io::Error::other("store is read-only"),
            ));
        }
        *self.enabled.lock().unwrap() = enabled.clone();
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}

/// How a [`FakeNode`] answers plugin calls.
#[derive(Clone)]
pub enum Reply {
    Ok,
    DownMidCall,
    Remote(&'static str),
}

/// [`NodeClient`] with scripted answers that records what it was asked.
pub struct FakeNode {
    reachable: bool,
    active: Mutex<PluginSet>,
    reply: Reply,
    delay: Duration,
    calls: Mutex<Vec<(ApplyAction, PluginSet)>>,
}

impl FakeNode {
    pub fn running(active: PluginSet) -> Self {
        Self {
            reachable: true,
            active: Mutex::new(active),
            reply: Reply::Ok,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn down() -> Self {
        Self {
            reachable: false,
            ..Self::running(PluginSet::new())
        }
    }

    pub fn replying(mut self, reply: Reply) -> Self {
        self.reply = reply;
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<(ApplyAction, PluginSet)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn active(&self) -> PluginSet {
        self.active.lock().unwrap().clone()
    }

    async fn respond(&self, action: ApplyAction, plugins: &PluginSet) -> Result<(), NodeError> {
        self.calls.lock().unwrap().push((action, plugins.clone()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.reply {
            Reply::Ok => {
                let mut active = self.active.lock().unwrap();
                *active = match action {
                    ApplyAction::Enable => active.union(plugins),
                    ApplyAction::Disable => active.difference(plugins),
                };
                Ok(())
            }
            Reply::DownMidCall => Err(NodeError::Down),
            Reply::Remote(payload) => Err(NodeError::Remote {
                payload: payload.to_string(),
            }),
        }
    }
}

#[async_trait]
impl NodeClient for FakeNode {
    fn name(&self) -> &str {
        "fake@node"
    }

    async fn is_alive(&self) -> bool {
        self.reachable
    }

    async fn active_plugins(&self) -> Result<PluginSet, NodeError> {
        if !self.reachable {
            return Err(NodeError::Down);
        }
        Ok(self.active())
    }

    async fn enable(&self, plugins: &PluginSet) -> Result<(), NodeError> {
        self.respond(ApplyAction::Enable, plugins).await
    }

    async fn disable(&self, plugins: &PluginSet) -> Result<(), NodeError> {
        self.respond(ApplyAction::Disable, plugins).await
    }
}

/// Command context over the given collaborators, with a short apply tick.
pub fn context<'a>(
    plugins_dir: &'a Path,
    store: &'a MemoryStore,
    node: &'a FakeNode,
    offline: bool,
) -> PluginContext<'a> {
    PluginContext {
        plugins_dir,
        store,
        node,
        offline,
        live_apply: LiveApply::new(Duration::from_millis(10)),
    }
}
