//! PostgreSQL Plugin Library
//!
//! HTTP service that runs SQL statements and schema introspection against
//! PostgreSQL on behalf of an agent platform.
//! The service binary is in src/main.rs, the registration command in
//! src/bin/register.rs.

pub mod config;
pub mod database;
pub mod error;
pub mod registration;
pub mod server;
pub mod telemetry;
