// sentimark - prediction-market intelligence, PDF reports and subscriptions
// Author: kelexine (https://github.com/kelexine)

use anyhow::Result;
use clap::Parser;
use sentimark::cli::Args;
use sentimark::config::AppConfig;
use sentimark::context::AppContext;
use sentimark::server::create_router;
use sentimark::utils::logging;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let mut config = AppConfig::load_from(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if args.check_config {
        print!("{}", config.to_redacted_toml()?);
        return Ok(());
    }

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting sentimark v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Build the application context
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let context = Arc::new(AppContext::new(config)?);
    context.start_maintenance();

    // Phase 4: Build and start HTTP server
    let app = create_router(context.clone())?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 5: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    context.shutdown().await;
    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
