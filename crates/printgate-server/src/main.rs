// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printgate — local HTTP print gateway.
//
// Entry point. Initialises logging, loads configuration, probes the print
// systems once, and serves the API.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use printgate_core::config::AppConfig;
use printgate_core::error::Result;
use printgate_print::{PrintService, PrintSystemProvider};
use printgate_server::allowlist::Allowlist;
use printgate_server::api::HttpFetcher;
use printgate_server::cli::Cli;
use printgate_server::{AppState, data_dir, serve};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "printgate failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(data_dir::config_path);
    let mut config = AppConfig::load(&config_path)?;
    cli.apply(&mut config);
    info!(config = %config_path.display(), "printgate {} starting", env!("CARGO_PKG_VERSION"));

    let provider = PrintSystemProvider::detect(&config).await?;
    if provider.backends().is_empty() {
        warn!("No print systems are available; every print request will fail");
    } else {
        info!(systems = ?provider.system_names(), "Print systems ready");
    }

    let allowlist = Arc::new(Allowlist::load(data_dir::allowlist_path())?);
    let state = AppState::new(
        PrintService::new(provider),
        allowlist,
        Arc::new(HttpFetcher::default()),
        config,
    );
    serve(state).await
}
