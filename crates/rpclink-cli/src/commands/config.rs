//! Config show/path/init/get command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use rpclink_core::Config;
use serde_json::Value;

use super::load_config;
use crate::ui;

/// Config subcommand.
#[derive(Debug, Clone)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Print the config file location.
    Path,
    /// Write the default configuration.
    Init {
        /// Overwrite an existing file.
        force: bool,
    },
    /// Print one value by dotted path.
    Get {
        /// Key such as `tcp.port`.
        key: String,
    },
}

/// Config command arguments.
#[derive(Debug, Clone)]
pub struct ConfigArgs {
    /// What to do.
    pub action: ConfigAction,
    /// Config file override.
    pub config: Option<PathBuf>,
}

/// Run the config command.
pub async fn run_config(args: ConfigArgs) -> Result<()> {
    let path = args.config.clone().unwrap_or_else(Config::default_path);

    match args.action {
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigAction::Init { force } => init_config(&path, force),
        ConfigAction::Show => {
            if !path.exists() {
                ui::info(&format!(
                    "No config file at {}; showing defaults",
                    path.display()
                ));
            }
            let config = load_config(args.config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigAction::Get { key } => {
            let config = load_config(args.config.as_deref())?;
            let value = serde_json::to_value(&config)?;
            match lookup(&value, &key) {
                Some(Value::String(s)) => println!("{s}"),
                Some(other) => println!("{}", serde_json::to_string_pretty(other)?),
                None => anyhow::bail!("Key not found: {key}"),
            }
            Ok(())
        }
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        ui::warning(&format!("Config file already exists: {}", path.display()));
        ui::info("Use --force to overwrite it");
        return Ok(());
    }

    Config::default().save(path)?;
    ui::success(&format!("Wrote default config to {}", path.display()));
    Ok(())
}

/// Navigate a dotted path (e.g. `serial.baudRate`).
fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(root, |current, part| match current {
        Value::Object(map) => map.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
