use crate::client::{ClientOptions, EventHandler, ExchangeObserver, McpClient};
use crate::config::{Config, Mode};
use crate::error::{McpSnagError, Result};
use crate::protocol::{Response, UserRequest};
use crate::ui::Printer;
use anyhow::Context;
use std::io::Write;
use std::sync::Arc;

/// How a run ended when no unexpected error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The server answered with a JSON-RPC error, already printed.
    RemoteError,
}

pub async fn run<W>(config: &Config, printer: Arc<Printer<W>>) -> anyhow::Result<Outcome>
where
    W: Write + Send + 'static,
{
    let mut options = ClientOptions::new(config.endpoint.clone());
    options.headers = config.headers.clone();
    options.session_id = config.session_id.clone();
    options.timeout = config.timeout;
    options.stream = config.stream;
    if printer.is_verbose() {
        let observer: Arc<dyn ExchangeObserver> = printer.clone();
        options.observer = Some(observer);
    }
    let mut client = McpClient::new(options)?;

    let request_data = match &config.mode {
        Mode::Raw(data) => return run_raw(&client, &printer, data).await,
        Mode::InitOnly => None,
        Mode::Request(data) => Some(data),
    };

    if config.session_id.is_none() {
        printer.print_verbose("* Initializing MCP session...");
        let result = client
            .initialize()
            .await
            .context("initialization failed")?;
        printer.print_verbose(&format!(
            "* Connected to {} {}",
            result.server_info.name, result.server_info.version
        ));
        printer.print_verbose(&format!("* Session ID: {}", client.session().id));
    }

    match request_data {
        Some(data) => run_request(&client, &printer, data).await,
        None => {
            printer.print_session_info(&client.session().id)?;
            Ok(Outcome::Success)
        }
    }
}

async fn run_request<W: Write>(
    client: &McpClient,
    printer: &Printer<W>,
    data: &str,
) -> anyhow::Result<Outcome> {
    let user_request = UserRequest::parse(data)?;

    let mut streamed = false;
    let mut print_event = |response: &Response| -> Result<()> {
        if let Some(result) = &response.result {
            printer.print_raw_json(result)?;
            streamed = true;
        }
        Ok(())
    };
    let handler: &mut EventHandler<'_> = &mut print_event;

    let outcome = client
        .request(
            &user_request.method,
            user_request.params.as_deref(),
            Some(handler),
        )
        .await;

    match outcome {
        Ok(response) => {
            if !streamed {
                if let Some(result) = response.as_ref().and_then(|r| r.result.as_deref()) {
                    printer.print_raw_json(result)?;
                }
            }
            Ok(Outcome::Success)
        }
        Err(err) => report_remote(printer, err),
    }
}

async fn run_raw<W: Write>(
    client: &McpClient,
    printer: &Printer<W>,
    data: &str,
) -> anyhow::Result<Outcome> {
    let mut streamed = false;
    let mut print_event = |response: &Response| -> Result<()> {
        if let Some(result) = &response.result {
            printer.print_raw_json(result)?;
            streamed = true;
        }
        Ok(())
    };
    let handler: &mut EventHandler<'_> = &mut print_event;

    let exchange = client
        .raw_request(data.as_bytes().to_vec(), Some(handler))
        .await?;

    if !exchange.session_id.is_empty() {
        printer.print_verbose(&format!("* Session ID: {}", exchange.session_id));
    }

    let Some(response) = exchange.response else {
        return Ok(Outcome::Success);
    };
    if let Some(error) = &response.error {
        printer.print_json(error)?;
        return Ok(Outcome::RemoteError);
    }
    if !streamed {
        if let Some(result) = &response.result {
            printer.print_raw_json(result)?;
        }
    }
    Ok(Outcome::Success)
}

/// Prints the server's structured error; anything else goes back to the
/// caller as a plain failure.
fn report_remote<W: Write>(printer: &Printer<W>, err: McpSnagError) -> anyhow::Result<Outcome> {
    if let Some(error) = err.remote_error() {
        printer.print_json(error)?;
        return Ok(Outcome::RemoteError);
    }
    Err(err.into())
}
