//! HTTP server
//!
//! Binds the listener, serves the router and closes cached connections once
//! a termination signal arrives.

pub mod auth;
pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::router;

use crate::config::{ServerConfig, AVAILABLE_ENDPOINTS};
use crate::database::QueryService;
use crate::error::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Serve until Ctrl-C or SIGTERM, then release all connections
pub async fn serve(config: ServerConfig, service: Arc<dyn QueryService>) -> Result<()> {
    let addr = config.bind_addr()?;
    let app = router(AppState::new(service.clone(), config.api_key.clone()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("PostgreSQL plugin listening on http://{}", addr);
    info!("Available endpoints: {}", AVAILABLE_ENDPOINTS.join(", "));
    if config.auth_enabled() {
        info!("API key authentication enabled");
    } else {
        warn!("No API key set - authentication disabled");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down gracefully...");
    service.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
