// PostgreSQL Plugin: SQL and schema introspection over HTTP
//
// This is the main entry point for the plugin service.

use anyhow::Result;
use postgresql_plugin::config::ServerConfig;
use postgresql_plugin::database::{ConnectionCache, PostgresService};
use postgresql_plugin::{server, telemetry};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    telemetry::init(&log_level)?;

    let config = ServerConfig::from_env()?;
    tracing::info!("PostgreSQL plugin v{}", env!("CARGO_PKG_VERSION"));

    let cache = Arc::new(ConnectionCache::new());
    let service = Arc::new(PostgresService::new(cache));

    server::serve(config, service).await?;
    Ok(())
}
