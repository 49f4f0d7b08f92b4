//! Mock ingest server binary

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use substream_mock_ingest::{build_router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting mock ingest server...");

    // Optional TOML config path as the first argument
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;

    tracing::info!(
        "Configuration: port={}, require_auth={}, max_resources={}",
        config.server.port,
        config.auth.require_auth,
        config.limits.max_resources
    );

    let bind_addr = config.bind_addr();
    let cleanup_interval = config.limits.cleanup_interval_seconds;
    let state = AppState::new(config);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Reclaim WHIP resources that clients never deleted
    let cleanup_handle = {
        let registry = state.registry.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            registry.run_cleanup_loop(cleanup_interval, shutdown_rx).await;
        })
    };

    let router = build_router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Mock server running on http://{}", listener.local_addr()?);

    let shutdown_tx_clone = shutdown_tx.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, initiating graceful shutdown...");
            let _ = shutdown_tx_clone.send(());
        })
        .await?;

    let _ = shutdown_tx.send(());
    let _ = cleanup_handle.await;

    tracing::info!("Mock ingest server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
