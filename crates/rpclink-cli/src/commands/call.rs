//! One request/response exchange with the device.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rpclink_core::{Id, Params, Request, Response};
use rpclink_transport::{Connector, ExchangeError};

use super::{LinkArgs, load_config};
use crate::ui;

/// Call command arguments.
#[derive(Debug, Clone)]
pub struct CallArgs {
    /// Remote method name.
    pub method: String,
    /// Positional or named params.
    pub params: Option<Params>,
    /// Request id.
    pub id: Id,
    /// Transport overrides.
    pub link: LinkArgs,
    /// Config file override.
    pub config: Option<PathBuf>,
}

/// Run the call command.
pub async fn run_call(args: CallArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    args.link.apply(&mut config)?;

    let mut builder = Request::builder(args.method).id(args.id);
    if let Some(params) = args.params {
        builder = builder.with_params(params);
    }
    let request = builder.build()?;

    let connector = Connector::new(config);
    tracing::debug!(
        "Exchange timeout {:?} over {}",
        connector.exchange().timeout(),
        connector.transport()
    );
    ui::header(&format!("Calling {} over {}", request.method(), connector.transport()));
    ui::json(&serde_json::to_value(&request)?);

    // The blocking HTTP client must not live on the async runtime.
    let outgoing = request.clone();
    let result = tokio::task::spawn_blocking(move || connector.call_once(&outgoing))
        .await
        .context("Exchange task failed")?;

    match result {
        Ok(response) => {
            report(&request, &response)?;
            Ok(())
        }
        Err(e) => Err(fault(e)),
    }
}

fn report(request: &Request, response: &Response) -> Result<()> {
    if !response.answers(request) {
        ui::warning(&format!(
            "Response id {} does not match request id {}",
            response
                .id()
                .map_or_else(|| "null".to_string(), ToString::to_string),
            request
                .id()
                .map_or_else(|| "null".to_string(), ToString::to_string),
        ));
    }

    match response.rpc_error() {
        None => ui::success("Response"),
        Some(error) => {
            let name = error.code_name().unwrap_or("application error");
            ui::error(&format!("Remote error {} ({name}): {}", error.code, error.message));
        }
    }
    ui::json(&serde_json::to_value(response)?);
    Ok(())
}

pub(crate) fn fault(error: ExchangeError) -> anyhow::Error {
    if let Some(raw) = error.raw() {
        ui::kv("received", &format!("{} bytes", raw.len()));
        ui::raw(raw);
    }
    let kind = error.kind();
    anyhow::Error::new(error).context(format!("Exchange failed: {kind}"))
}
