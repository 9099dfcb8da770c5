//! Database module
//!
//! This module provides the per-URL connection cache, statement execution
//! and schema introspection against PostgreSQL.

pub mod cache;
pub mod cells;
pub mod connection;
pub mod executor;
pub mod indexer;
pub mod manager;
pub mod params;
pub mod schema;
pub mod types;

// Re-exports
pub use cache::ConnectionCache;
pub use manager::{PostgresService, QueryService};
pub use schema::{ColumnInfo, TableInfo};
pub use types::{
    DatabaseInfoRequest, DatabaseInfoResponse, JsonRow, QueryOutcome, QueryRequest, QueryResponse,
};
