//! HTTP handlers
//!
//! Each protected handler authenticates first, then parses the raw body, so
//! a bad token is reported before a bad body.

use crate::config::SERVICE_NAME;
use crate::database::{DatabaseInfoRequest, QueryRequest, QueryService};
use crate::error::{PluginError, Result};
use crate::server::auth::authorize;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn QueryService>,
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(service: Arc<dyn QueryService>, api_key: Option<String>) -> Self {
        Self {
            service,
            api_key: api_key.map(Arc::from),
        }
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<()> {
        authorize(self.api_key.as_deref(), headers)
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body).map_err(|_| PluginError::InvalidRequestBody)
}

fn status_for(success: bool) -> StatusCode {
    if success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        service: SERVICE_NAME,
    })
}

/// Execute a SQL statement
pub async fn run_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    state.authorize(&headers)?;
    let request: QueryRequest = parse_body(&body)?;

    let response = state.service.execute_query(request).await;
    Ok((status_for(response.success), Json(response)).into_response())
}

/// Describe the public schema
pub async fn database_info(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    state.authorize(&headers)?;
    let request: DatabaseInfoRequest = parse_body(&body)?;

    let response = state.service.database_info(request).await;
    if let Some(tables) = &response.tables {
        info!(tables = tables.len(), "Database info request served");
    }
    Ok((status_for(response.success), Json(response)).into_response())
}

/// Fallback for unknown paths
pub async fn not_found() -> PluginError {
    PluginError::NotFound
}

/// Fallback for unsupported methods on known paths
pub async fn method_not_allowed() -> PluginError {
    PluginError::MethodNotAllowed
}
