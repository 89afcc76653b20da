//! canned server entry point.
//!
//! Loads configuration, installs logging, picks replay or capture mode and
//! serves until SIGINT or SIGTERM.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use canned_core::AppConfig;
use canned_server::{Resolver, http, logging};
use clap::Parser;
use figment::providers::Serialized;

mod args;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = args::Cli::parse();

    let config = match AppConfig::load_with(Serialized::defaults(cli.overrides())) {
        Ok(config) => config,
        Err(err) => return startup_failure(&err.to_string(), 2),
    };

    let _log_guard = match logging::init(&config) {
        Ok(guard) => {
            if let Some(path) = guard.path() {
                eprintln!("Logging to {}", path.display());
            }
            guard
        }
        Err(err) => return startup_failure(&format!("{err:#}"), 1),
    };

    let code: u8 = match run(&config).await {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!("{err:#}");
            1
        }
    };

    tracing::info!(code, "exited with code {code}");

    ExitCode::from(code)
}

/// Report a failure that happens before the subscriber can record the exit.
fn startup_failure(reason: &str, code: u8) -> ExitCode {
    eprintln!("{}", startup_failure_message(reason, code));
    ExitCode::from(code)
}

fn startup_failure_message(reason: &str, code: u8) -> String {
    format!("canned: {reason}; exited with code {code}")
}

async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let resolver = Resolver::from_config(config).await?;
    let mode = resolver.mode_name();

    let listener = http::bind(config.port)
        .await
        .with_context(|| format!("bind port {}", config.port))?;
    let server = http::spawn(listener, Arc::new(resolver)).context("start listener")?;

    tracing::info!(addr = %server.local_addr(), mode, "canned is running on port {}", server.local_addr().port());

    let signal = shutdown_signal().await?;
    tracing::info!(signal, "received {signal}, shutting down");

    server.shutdown().await;

    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate()).context("install SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("listen for SIGINT")?;
            Ok("SIGINT")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<&'static str> {
    tokio::signal::ctrl_c().await.context("listen for ctrl-c")?;
    Ok("ctrl-c")
}
