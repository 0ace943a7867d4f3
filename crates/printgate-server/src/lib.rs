// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printgate Server — the HTTP face of the gateway. Routes, origin checks,
// and the listener loop used by the `printgate` binary.

pub mod allowlist;
pub mod api;
pub mod cli;
pub mod data_dir;
pub mod pages;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use printgate_core::config::AppConfig;
use printgate_core::error::Result;
use printgate_print::PrintService;

use crate::allowlist::{Allowlist, enforce_origin};
use crate::api::FileFetcher;
use crate::api::routes;

/// Shared handles every request needs.
#[derive(Clone)]
pub struct AppState {
    pub service: PrintService,
    pub allowlist: Arc<Allowlist>,
    pub fetcher: Arc<dyn FileFetcher>,
    pub config: Arc<AppConfig>,
    pub version: &'static str,
}

impl AppState {
    pub fn new(
        service: PrintService,
        allowlist: Arc<Allowlist>,
        fetcher: Arc<dyn FileFetcher>,
        config: AppConfig,
    ) -> Self {
        for origin in &config.allowed_origins {
            allowlist.allow(origin);
        }
        Self {
            service,
            allowlist,
            fetcher,
            config: Arc::new(config),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// All routes with origin enforcement, body and concurrency limits, and
/// request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/printers", get(routes::list_printers))
        .route("/print-job", post(routes::submit_print_job))
        .route("/print/shipping-label", post(routes::submit_print_job))
        .route("/print-jobs/{job_id}", get(routes::get_print_job))
        .route("/print-job/{job_id}", get(routes::get_print_job))
        .route("/domains/approve", get(routes::approve_domain_page))
        .route("/domains/submit", post(routes::submit_domain))
        .layer(middleware::from_fn_with_state(state.clone(), enforce_origin))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(GlobalConcurrencyLimitLayer::new(state.config.max_concurrent_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The address to listen on: loopback only unless external access is on.
pub fn listen_addr(config: &AppConfig) -> SocketAddr {
    let ip = if config.enable_external_access {
        [0, 0, 0, 0]
    } else {
        [127, 0, 0, 1]
    };
    SocketAddr::from((ip, config.port))
}

/// Serve until Ctrl-C or SIGTERM.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = listen_addr(&state.config);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{addr}");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
