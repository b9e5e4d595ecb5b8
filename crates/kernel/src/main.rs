//! Plugsync
//!
//! Enable and disable plugins for a service node, online or offline.

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use plugsync_kernel::args::{Cli, Command};
use plugsync_kernel::config::Config;
use plugsync_kernel::error::{AppError, AppResult, EXIT_OK, EXIT_USAGE};
use plugsync_kernel::plugin::cli::{
    PluginContext, cmd_plugin_disable, cmd_plugin_enable, cmd_plugin_list,
};
use plugsync_kernel::plugin::{FileStateStore, HttpNodeClient, LiveApply, NodeClient};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version requests also arrive here.
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_OK };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = Config::from_env().map_err(|e| AppError::Config(format!("{e:#}")))?;

    // A bad -n is a usage error; a bad PLUGSYNC_NODE is a configuration error.
    let node = match &cli.node {
        Some(node) => HttpNodeClient::new(node, config.node_probe_timeout)
            .map_err(|e| AppError::Usage(format!("{e:#}")))?,
        None => HttpNodeClient::new(&config.node, config.node_probe_timeout)
            .context("PLUGSYNC_NODE")
            .map_err(|e| AppError::Config(format!("{e:#}")))?,
    };
    info!(node = %node.name(), plugins_dir = %config.plugins_dir.display(), "starting");

    let store = FileStateStore::new(&config.enabled_plugins_file);

    let ctx = PluginContext {
        plugins_dir: &config.plugins_dir,
        store: &store,
        node: &node,
        offline: cli.offline,
        live_apply: LiveApply::new(config.apply_poll_interval),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let result = match cli.command {
        Command::List(args) => cmd_plugin_list(&ctx, &args.options(), &mut out).await,
        Command::Enable { names } => cmd_plugin_enable(&ctx, &names, &mut out).await,
        Command::Disable { names } => cmd_plugin_disable(&ctx, &names, &mut out).await,
    };
    let _ = out.flush();
    debug!(ok = result.is_ok(), "command finished");

    result.map_err(AppError::from)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
