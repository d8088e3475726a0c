//! rpclink CLI - call JSON-RPC methods on an embedded device.

mod commands;
mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rpclink_core::config::LogFormat;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::LinkArgs;

#[derive(Parser)]
#[command(name = "rpclink")]
#[command(about = "rpclink - JSON-RPC 2.0 over HTTP, TCP, and serial")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.rpclink/rpclink.json)
    #[arg(short, long, global = true, env = "RPCLINK_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a method and print the response
    Call {
        /// Method name (e.g. add2)
        method: String,

        /// Params as JSON: array, object, or bare value (e.g. '[5,6]', '7')
        params: Option<String>,

        /// Request id; integers are sent as numbers
        #[arg(long, default_value = "1")]
        id: String,

        #[command(flatten)]
        link: LinkArgs,
    },

    /// Send a notification without waiting for a reply
    Notify {
        /// Method name (e.g. doit)
        method: String,

        /// Params as JSON: array, object, or bare value
        params: Option<String>,

        #[command(flatten)]
        link: LinkArgs,
    },

    /// Show or create the configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Get a configuration value
    Get {
        /// Configuration key (e.g., tcp.port)
        key: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.config.as_deref());

    match cli.command {
        Commands::Call {
            method,
            params,
            id,
            link,
        } => {
            let args = commands::call::CallArgs {
                method,
                params: params.as_deref().map(commands::parse_params).transpose()?,
                id: commands::parse_id(&id),
                link,
                config: cli.config,
            };
            commands::run_call(args).await?;
        }

        Commands::Notify {
            method,
            params,
            link,
        } => {
            let args = commands::notify::NotifyArgs {
                method,
                params: params.as_deref().map(commands::parse_params).transpose()?,
                link,
                config: cli.config,
            };
            commands::run_notify(args).await?;
        }

        Commands::Config { action } => {
            let action = match action {
                Some(ConfigCommands::Show) | None => commands::config::ConfigAction::Show,
                Some(ConfigCommands::Path) => commands::config::ConfigAction::Path,
                Some(ConfigCommands::Init { force }) => {
                    commands::config::ConfigAction::Init { force }
                }
                Some(ConfigCommands::Get { key }) => commands::config::ConfigAction::Get { key },
            };
            let args = commands::config::ConfigArgs {
                action,
                config: cli.config,
            };
            commands::run_config(args).await?;
        }
    }

    Ok(())
}

/// Install the tracing subscriber; `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool, config_path: Option<&std::path::Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    // Config errors surface later, with logging in place.
    let format = commands::load_config(config_path)
        .map(|c| c.settings.log_format)
        .unwrap_or_default();

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).init(),
    }
}
