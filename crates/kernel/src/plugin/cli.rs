//! CLI command implementations for plugin management.
//!
//! Each command reads the catalog fresh, asks the node what it is running,
//! and for enable/disable stores the new configuration before trying to
//! apply it to the node. Output goes to the supplied writer.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use regex::Regex;
use tracing::{debug, warn};

use super::apply::{ApplyAction, ApplyOutcome, ApplyState, LiveApply};
use super::catalog::Catalog;
use super::dependency::{Direction, closure};
use super::error::PluginError;
use super::node::{ActiveState, NodeClient};
use super::reconcile::{Change, Reconciler};
use super::set::PluginSet;
use super::status::StateStore;

/// Everything a plugin command needs.
pub struct PluginContext<'a> {
    pub plugins_dir: &'a Path,
    pub store: &'a dyn StateStore,
    pub node: &'a dyn NodeClient,
    /// Proceed with enable/disable when the node cannot be contacted.
    pub offline: bool,
    pub live_apply: LiveApply,
}

/// How much detail `list` prints per plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListFormat {
    #[default]
    Normal,
    Verbose,
    Minimal,
}

/// Which plugins `list` shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListFilter {
    #[default]
    All,
    /// Only explicitly enabled plugins.
    Explicit,
    /// Explicitly or implicitly enabled plugins.
    Enabled,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Regular expression matched anywhere in the plugin name.
    pub pattern: Option<String>,
    pub format: ListFormat,
    pub filter: ListFilter,
}

/// One row of `list` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub dependencies: Vec<String>,
    pub explicit: bool,
    pub implicit: bool,
    pub running: bool,
    /// Enabled but not present in the catalog.
    pub missing: bool,
}

impl ListEntry {
    /// `[E*]`-style status marker.
    pub fn glyph(&self) -> String {
        let enabled = match (self.explicit, self.implicit) {
            (true, _) => 'E',
            (false, true) => 'e',
            _ => ' ',
        };
        let running = if self.running { '*' } else { ' ' };
        format!("[{enabled}{running}]")
    }
}

/// Select and annotate the plugins `list` shows, in name order.
pub fn select_plugins(
    catalog: &Catalog,
    explicit: &PluginSet,
    running: Option<&PluginSet>,
    options: &ListOptions,
) -> Result<Vec<ListEntry>, PluginError> {
    let pattern = options.pattern.as_deref().unwrap_or(".*");
    let re = Regex::new(pattern).map_err(|e| PluginError::InvalidPattern {
        pattern: pattern.to_string(),
        details: e.to_string(),
    })?;

    let enabled = closure(Direction::Dependencies, explicit, catalog);
    let implicit = enabled.difference(explicit);
    let missing = enabled.difference(&catalog.names());
    let no_running = PluginSet::new();
    let running = running.unwrap_or(&no_running);

    let entry = |name: &str| ListEntry {
        name: name.to_string(),
        version: catalog.get(name).and_then(|p| p.version.clone()),
        description: catalog.get(name).and_then(|p| p.description.clone()),
        dependencies: catalog
            .get(name)
            .map(|p| p.dependencies.clone())
            .unwrap_or_default(),
        explicit: explicit.contains(name),
        implicit: implicit.contains(name),
        running: running.contains(name),
        missing: missing.contains(name),
    };

    let entries = catalog
        .names()
        .union(&missing)
        .iter()
        .filter(|name| re.is_match(name))
        .filter(|name| match options.filter {
            ListFilter::All => true,
            ListFilter::Explicit => explicit.contains(name),
            ListFilter::Enabled => enabled.contains(name),
        })
        .map(entry)
        .collect();

    Ok(entries)
}

/// Render `list` output.
pub fn write_plugin_list<W: Write>(
    out: &mut W,
    entries: &[ListEntry],
    format: ListFormat,
    status_line: &str,
) -> std::io::Result<()> {
    if format != ListFormat::Minimal {
        writeln!(out, " Configured: E = explicitly enabled; e = implicitly enabled")?;
        writeln!(out, " | Status:   {status_line}")?;
        writeln!(out, " |/")?;
    }

    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);

    for entry in entries {
        let version = match (&entry.version, entry.missing) {
            (_, true) => "(missing)",
            (Some(v), false) => v.as_str(),
            (None, false) => "",
        };

        match format {
            ListFormat::Minimal => writeln!(out, "{}", entry.name)?,
            ListFormat::Normal => {
                let line = format!("{} {:<width$} {}", entry.glyph(), entry.name, version);
                writeln!(out, "{}", line.trim_end())?;
            }
            ListFormat::Verbose => {
                writeln!(out, "{} {}", entry.glyph(), entry.name)?;
                if !version.is_empty() {
                    writeln!(out, "     Version:     \t{version}")?;
                }
                if !entry.dependencies.is_empty() {
                    writeln!(out, "     Dependencies:\t[{}]", entry.dependencies.join(", "))?;
                }
                if let Some(description) = &entry.description {
                    writeln!(out, "     Description: \t{description}")?;
                }
                writeln!(out)?;
            }
        }
    }

    Ok(())
}

/// List discovered plugins with their configured and running status.
pub async fn cmd_plugin_list<W: Write>(
    ctx: &PluginContext<'_>,
    options: &ListOptions,
    out: &mut W,
) -> Result<()> {
    let catalog = Catalog::discover(ctx.plugins_dir)?;
    let explicit = ctx.store.read_enabled()?;

    // Status is informational here; a node that cannot be asked is not fatal.
    let active = match ActiveState::probe(ctx.node).await {
        Ok(active) => active,
        Err(e) => {
            warn!(node = %ctx.node.name(), error = %e, "could not read active plugins");
            ActiveState::Unreachable {
                node: ctx.node.name().to_string(),
            }
        }
    };
    let status_line = match &active {
        ActiveState::Reachable(_) => format!("* = running on {}", ctx.node.name()),
        ActiveState::Unreachable { node } => {
            format!("[failed to contact {node} - status not shown]")
        }
    };

    let entries = select_plugins(&catalog, &explicit, active.plugins(), options)?;
    debug!(shown = entries.len(), total = catalog.len(), "listing plugins");

    write_plugin_list(out, &entries, options.format, &status_line)?;
    Ok(())
}

/// Enable plugins (and their dependencies), then apply to the node.
pub async fn cmd_plugin_enable<W: Write>(
    ctx: &PluginContext<'_>,
    names: &[String],
    out: &mut W,
) -> Result<()> {
    let catalog = Catalog::discover(ctx.plugins_dir)?;
    let active = ActiveState::probe(ctx.node).await?;

    let outcome = Reconciler::new(&catalog, ctx.store)
        .offline(ctx.offline)
        .enable(names, &active)?;

    match outcome.change {
        Change::Changed { delta, apply } if !delta.is_empty() => {
            write_names(out, "The following plugins have been enabled:", &delta)?;
            apply_change(ctx, ApplyAction::Enable, &apply, out).await?;
        }
        Change::Changed { .. } | Change::Unchanged => {
            writeln!(out, "Plugin configuration unchanged.")?;
        }
    }
    Ok(())
}

/// Disable plugins (and everything depending on them), then apply to the node.
pub async fn cmd_plugin_disable<W: Write>(
    ctx: &PluginContext<'_>,
    names: &[String],
    out: &mut W,
) -> Result<()> {
    let catalog = Catalog::discover(ctx.plugins_dir)?;
    let active = ActiveState::probe(ctx.node).await?;

    let outcome = Reconciler::new(&catalog, ctx.store)
        .offline(ctx.offline)
        .disable(names, &active)?;

    if !outcome.unknown.is_empty() {
        writeln!(
            out,
            "Warning: the following plugins could not be found: {}",
            outcome.unknown
        )?;
    }

    match outcome.change {
        Change::Changed { delta, apply } if !delta.is_empty() => {
            write_names(out, "The following plugins have been disabled:", &delta)?;
            apply_change(ctx, ApplyAction::Disable, &apply, out).await?;
        }
        // A disable can store a change whose effective delta is empty.
        Change::Changed { .. } | Change::Unchanged => {
            writeln!(out, "Plugin configuration unchanged.")?;
        }
    }
    Ok(())
}

fn write_names<W: Write>(out: &mut W, header: &str, names: &PluginSet) -> std::io::Result<()> {
    if names.is_empty() {
        return Ok(());
    }
    writeln!(out, "{header}")?;
    for name in names {
        writeln!(out, "  {name}")?;
    }
    Ok(())
}

/// Push a stored change to the running node and report how it went.
///
/// Failures here are reported but do not fail the command: the stored
/// configuration is already in place and takes effect on the next start.
async fn apply_change<W: Write>(
    ctx: &PluginContext<'_>,
    action: ApplyAction,
    targets: &PluginSet,
    out: &mut W,
) -> Result<()> {
    let node = ctx.node.name();
    let mut dispatched = false;

    let outcome = ctx
        .live_apply
        .run(ctx.node, action, targets, |state| {
            let written = match state {
                ApplyState::Dispatched => {
                    dispatched = true;
                    write!(out, "Applying plugin configuration to {node}...")
                }
                ApplyState::Polling { .. } => write!(out, "."),
            };
            if let Err(e) = written.and_then(|()| out.flush()) {
                debug!(error = %e, "failed to write progress");
            }
        })
        .await;

    if dispatched {
        match outcome {
            ApplyOutcome::Done => writeln!(out, " done.")?,
            _ => writeln!(out, " failed.")?,
        }
    }

    match outcome {
        ApplyOutcome::Done => {}
        ApplyOutcome::NodeDown if dispatched => writeln!(
            out,
            "Warning: {node} went down while applying changes; \
             start it to apply the pending changes."
        )?,
        ApplyOutcome::NodeDown => writeln!(
            out,
            "Offline change; changes will take effect when {node} is next started."
        )?,
        ApplyOutcome::RemoteError { action, payload } => writeln!(
            out,
            "Warning: error on {node} during plugin {action}: {payload}. \
             Restart {node} to retry."
        )?,
    }
    Ok(())
}
