//! MediaVeed command line binary.

mod cli;
mod commands;
mod metrics;

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mveed_client::{ClientConfig, MediaVeed};

use crate::cli::Cli;

fn init_tracing() {
    // Colored output for dev, JSON for log collectors
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,mveed=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let metrics_handle = if cli.global.metrics {
        match metrics::init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to install metrics recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    let config = cli.global.apply(ClientConfig::from_env());
    debug!(
        api = %config.api_base_url,
        extractor = %config.extractor_base_url,
        "Client config loaded"
    );

    let code = match MediaVeed::new(config) {
        Ok(app) => match commands::run(&app, cli.command).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("Failed to build client: {}", e);
            ExitCode::FAILURE
        }
    };

    if let Some(handle) = metrics_handle {
        print!("{}", handle.render());
    }
    code
}
