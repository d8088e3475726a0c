//! Fire-and-forget notification.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rpclink_core::{Params, Request};
use rpclink_transport::Connector;

use super::call::fault;
use super::{LinkArgs, load_config};
use crate::ui;

/// Notify command arguments.
#[derive(Debug, Clone)]
pub struct NotifyArgs {
    /// Remote method name.
    pub method: String,
    /// Positional or named params.
    pub params: Option<Params>,
    /// Transport overrides.
    pub link: LinkArgs,
    /// Config file override.
    pub config: Option<PathBuf>,
}

/// Run the notify command.
pub async fn run_notify(args: NotifyArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    args.link.apply(&mut config)?;

    let request = Request::notification(args.method, args.params)?;
    let connector = Connector::new(config);
    let transport = connector.transport();

    let outgoing = request.clone();
    tokio::task::spawn_blocking(move || connector.notify_once(&outgoing))
        .await
        .context("Exchange task failed")?
        .map_err(fault)?;

    ui::success(&format!("Sent {} over {transport}", request.method()));
    Ok(())
}
