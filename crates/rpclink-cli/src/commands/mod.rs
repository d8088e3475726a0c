//! CLI command implementations.

pub mod call;
pub mod config;
pub mod notify;

pub use call::run_call;
pub use config::run_config;
pub use notify::run_notify;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use rpclink_core::{Config, Id, Params, TransportKind};
use serde_json::Value;

/// Transport selection and endpoint overrides shared by `call` and `notify`.
#[derive(Debug, Clone, Default, Args)]
pub struct LinkArgs {
    /// Transport: http, tcp, or serial
    #[arg(short, long)]
    pub transport: Option<TransportKind>,

    /// HTTP endpoint URL
    #[arg(long)]
    pub url: Option<String>,

    /// TCP host
    #[arg(long)]
    pub host: Option<String>,

    /// TCP port
    #[arg(long)]
    pub port: Option<u16>,

    /// Serial device path
    #[arg(long)]
    pub device: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    pub baud: Option<u32>,

    /// Exchange timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl LinkArgs {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
        if let Some(url) = &self.url {
            config.http.url.clone_from(url);
        }
        if let Some(host) = &self.host {
            config.tcp.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.tcp.port = port;
        }
        if let Some(device) = &self.device {
            config.serial.path.clone_from(device);
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        config.validate().context("Invalid connection settings")?;
        Ok(())
    }
}

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load_default().context("Failed to load config"),
    }
}

/// Parse a params argument: a JSON array, object, or bare value.
pub fn parse_params(text: &str) -> Result<Params> {
    let value: Value =
        serde_json::from_str(text).with_context(|| format!("Params are not valid JSON: {text}"))?;
    Params::from_value(value)
        .ok_or_else(|| anyhow::anyhow!("Params cannot be null; omit them instead"))
}

/// Parse an id argument: integers stay numeric, anything else is a string.
pub fn parse_id(text: &str) -> Id {
    text.parse::<i64>()
        .map_or_else(|_| Id::String(text.to_string()), Id::Number)
}
