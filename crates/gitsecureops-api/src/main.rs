//! GitSecureOps API Server
//!
//! HTTP front-end for aggregated GitHub code search.

use anyhow::Context;
use gitsecureops_api::bootstrap::{CONFIG_FILE_ENV, initialize_app_state, load_config};
use gitsecureops_api::create_router;
use gitsecureops_common::{LogFormat, init_tracing};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gitsecureops_common::initialize_environment();

    let config_file = std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from);
    let config = load_config(config_file.as_deref())?;

    let format = if config.telemetry.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing(&config.telemetry.tracing_level, format);

    info!(
        service = %config.telemetry.service_name,
        environment = %config.telemetry.environment,
        "Starting GitSecureOps API server..."
    );

    let addr = config.api.bind_address();
    let state = initialize_app_state(config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(error = %error, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("Shutdown signal received");
}
