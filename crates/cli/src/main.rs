// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use tracing::error;

use jigai::hub_client::{HubClient, DEFAULT_HUB_URL};
use jigai::watcher::Watcher;
use jigai::{command, config, patterns};

#[derive(Parser)]
#[command(name = "jigai", version, about = "Know when your AI coding agent is waiting for you.")]
struct Cli {
    #[command(subcommand)]
    subcommand: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Watch a command and notify when it goes idle.
    Watch(WatchArgs),
    /// Manage the jigai notification hub.
    Server {
        #[command(subcommand)]
        subcommand: ServerCommands,
    },
    /// Manage jigai configuration.
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommands,
    },
    /// Show all loaded idle detection patterns.
    Patterns,
    /// List active watched sessions (requires a running hub).
    Sessions {
        /// Hub port.
        #[arg(long, short = 'p', default_value_t = 9384, env = "JIGAI_HUB_PORT")]
        port: u16,
    },
}

#[derive(clap::Args)]
struct WatchArgs {
    /// Override tool detection (e.g. claude_code, codex, my_agent).
    #[arg(long, short = 't')]
    tool: Option<String>,

    /// Disable desktop notifications.
    #[arg(long)]
    no_notify: bool,

    /// Don't push events to the jigai hub.
    #[arg(long)]
    no_server: bool,

    /// Override the idle timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Command to watch (e.g. `claude`, `codex`, `python agent.py`).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    command: Vec<String>,
}

#[derive(clap::Subcommand)]
enum ServerCommands {
    /// Start the notification hub.
    Start {
        /// Port to listen on.
        #[arg(long, short = 'p', default_value_t = 9384, env = "JIGAI_HUB_PORT")]
        port: u16,
        /// Host to bind on.
        #[arg(long, default_value = "0.0.0.0", env = "JIGAI_HUB_HOST")]
        host: String,
        /// Disable mDNS service announcement.
        #[arg(long)]
        no_mdns: bool,
    },
    /// Check whether the hub is running.
    Status {
        /// Hub port.
        #[arg(long, short = 'p', default_value_t = 9384, env = "JIGAI_HUB_PORT")]
        port: u16,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Create default configuration files under ~/.jigai.
    Init,
    /// Show the effective configuration.
    Show,
    /// Test a line of terminal output against the loaded patterns.
    Test {
        /// A line of terminal output.
        line: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Stdout carries the proxied child stream; all logging goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = match cli.subcommand {
        Commands::Watch(args) => watch(args).await,
        Commands::Server { subcommand } => match subcommand {
            ServerCommands::Start { port, host, no_mdns } => {
                let config = jigai_hub::config::HubConfig { host, port, no_mdns };
                match jigai_hub::run(config).await {
                    Ok(()) => 0,
                    Err(e) => {
                        error!("fatal: {e:#}");
                        1
                    }
                }
            }
            ServerCommands::Status { port } => command::server_status(port).await,
        },
        Commands::Config { subcommand } => match subcommand {
            ConfigCommands::Init => command::config_init(),
            ConfigCommands::Show => command::config_show(),
            ConfigCommands::Test { line } => command::config_test(&line),
        },
        Commands::Patterns => command::patterns_cmd(),
        Commands::Sessions { port } => command::sessions_cmd(port).await,
    };

    std::process::exit(code);
}

async fn watch(args: WatchArgs) -> i32 {
    let mut config = config::load();
    let mut registry = patterns::load();

    if args.no_notify {
        config.notifications.desktop = false;
    }
    if let Some(timeout) = args.timeout {
        registry.timeout_seconds = timeout;
    }
    let registry = Arc::new(registry);

    let hub = if args.no_server {
        None
    } else {
        let client = HubClient::new(DEFAULT_HUB_URL);
        if client.is_running().await {
            eprintln!("[jigai]   hub: connected");
            Some(Arc::new(client))
        } else {
            eprintln!("[jigai]   hub: not running (use `jigai server start` for remote clients)");
            None
        }
    };

    let mut watcher = Watcher::new(args.command, args.tool, config, registry, hub);
    match watcher.run().await {
        Ok(code) => code,
        Err(e) => {
            error!("fatal: {e:#}");
            1
        }
    }
}
