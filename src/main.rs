use clap::Parser;
use colored::*;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use mcpsnag::cli::Args;
use mcpsnag::config::Config;
use mcpsnag::orchestrator::{self, Outcome};
use mcpsnag::ui::Printer;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing();

    let config = match Config::from_env_and_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            eprintln!("{}", "Run 'mcpsnag --help' for usage.".dimmed());
            process::exit(1);
        }
    };

    let printer = Arc::new(Printer::stdout(config.compact, config.verbose));

    match orchestrator::run(&config, Arc::clone(&printer)).await {
        Ok(Outcome::Success) => {}
        Ok(Outcome::RemoteError) => process::exit(1),
        Err(e) => {
            printer.print_error(&format!("{:#}", e));
            process::exit(1);
        }
    }
}

/// Diagnostics go to stderr so they never mix with JSON on stdout.
/// `RUST_LOG=mcpsnag=debug` shows exchange details.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
