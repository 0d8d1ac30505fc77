use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use shopfront_service::config::Settings;
use shopfront_service::products::create_product_store;
use shopfront_service::server::{create_app, AppState};
use shopfront_service::shutdown::{GracefulShutdown, ShutdownConfig};
use shopfront_service::tasks::HeartbeatTask;
use shopfront_service::telemetry::init_telemetry;
use shopfront_service::users::create_user_directory;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize tracing; the guard flushes spans on exit
    let _telemetry = init_telemetry(&settings.otel, settings.logging.format)?;
    tracing::info!("Configuration loaded");

    let (directory, postgres_pool) = create_user_directory(&settings.database).await?;
    let product_store = create_product_store(postgres_pool.as_ref()).await?;

    // Create application state
    let state = AppState::new(settings.clone(), directory, postgres_pool.clone())
        .with_products(product_store);
    tracing::info!("Application state initialized");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start heartbeat task in background
    let heartbeat_task = HeartbeatTask::new(
        settings.websocket.clone(),
        state.sessions.clone(),
        shutdown_tx.subscribe(),
    );
    let heartbeat_handle = tokio::spawn(async move {
        heartbeat_task.run().await;
    });

    let graceful = GracefulShutdown::with_config(
        state.sessions.clone(),
        shutdown_tx,
        ShutdownConfig {
            reconnect_after_seconds: settings.websocket.reconnect_after_seconds,
            ..ShutdownConfig::default()
        },
    );

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let reason = wait_for_signal().await;
            graceful.execute(reason).await;
        })
        .await?;

    tracing::info!("Waiting for background tasks to finish...");
    let _ = heartbeat_handle.await;

    if let Some(pool) = postgres_pool {
        pool.close().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM with a reason for clients.
async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
            "Server is shutting down"
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
            "Server is restarting"
        }
    }
}
