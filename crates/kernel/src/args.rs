//! Command-line arguments.

use clap::{Args, Parser, Subcommand};

use crate::plugin::cli::{ListFilter, ListFormat, ListOptions};

/// Manage which plugins are enabled on a node.
#[derive(Parser, Debug)]
#[command(name = "plugsync", author, version, about, long_about = None)]
pub struct Cli {
    /// Node to query and update (`host:port` or URL). Overrides PLUGSYNC_NODE.
    #[arg(short = 'n', long, global = true)]
    pub node: Option<String>,

    /// Change the stored configuration even if the node cannot be contacted.
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List plugins and their status.
    List(ListArgs),

    /// Enable plugins and their dependencies.
    Enable {
        /// Plugins to enable.
        names: Vec<String>,
    },

    /// Disable plugins and everything that depends on them.
    Disable {
        /// Plugins to disable.
        names: Vec<String>,
    },
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Regular expression to filter plugin names.
    pub pattern: Option<String>,

    /// Show version, dependencies and description.
    #[arg(short = 'v', long, conflicts_with = "minimal")]
    pub verbose: bool,

    /// Show plugin names only.
    #[arg(short = 'm', long)]
    pub minimal: bool,

    /// Only explicitly enabled plugins.
    #[arg(short = 'E', long = "explicit")]
    pub explicit: bool,

    /// Explicitly or implicitly enabled plugins.
    #[arg(short = 'e', long)]
    pub enabled: bool,
}

impl ListArgs {
    pub fn options(&self) -> ListOptions {
        let format = if self.verbose {
            ListFormat::Verbose
        } else if self.minimal {
            ListFormat::Minimal
        } else {
            ListFormat::Normal
        };

        let filter = if self.explicit {
            ListFilter::Explicit
        } else if self.enabled {
            ListFilter::Enabled
        } else {
            ListFilter::All
        };

        ListOptions {
            pattern: self.pattern.clone(),
            format,
            filter,
        }
    }
}
