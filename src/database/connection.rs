//! Connection strings and pool construction
//!
//! Validation of incoming connection strings and creation of the lazily
//! connected pools held by the connection cache.

use crate::config::PoolSettings;
use crate::error::{PluginError, Result};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;

/// Accepted connection string scheme
pub const POSTGRES_SCHEME: &str = "postgresql://";

/// Check that a connection string is usable
///
/// Only the `postgresql://` scheme is accepted; the rest of the URI is left
/// to the driver and fails when the first statement runs.
pub fn validate_database_url(url: &str) -> Result<()> {
    if url.is_empty() || !url.starts_with(POSTGRES_SCHEME) {
        return Err(PluginError::InvalidDatabaseUrl);
    }
    Ok(())
}

/// Check that the statement text is not blank
pub fn validate_query(sql: &str) -> Result<()> {
    if sql.trim().is_empty() {
        return Err(PluginError::EmptyQuery);
    }
    Ok(())
}

/// Build a pool for `url` without connecting
///
/// The first session is opened when a statement needs it.
pub fn open_lazy_pool(url: &str, settings: &PoolSettings) -> Result<PgPool> {
    let options = PgConnectOptions::from_str(url)?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(0)
        .idle_timeout(settings.idle_timeout)
        .acquire_timeout(settings.connect_timeout)
        .connect_lazy_with(options);

    Ok(pool)
}
