//! Router construction
//!
//! Exact-path routes with a not-found fallback. The CORS layer answers every
//! `OPTIONS` request itself, so preflights never reach authentication.

use crate::server::handlers::{
    database_info, health, method_not_allowed, not_found, run_query, AppState,
};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::routing::{any, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", any(health))
        .route("/query", post(run_query).fallback(method_not_allowed))
        .route("/database-info", post(database_info).fallback(method_not_allowed))
        .fallback(not_found)
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Permissive CORS policy
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}
