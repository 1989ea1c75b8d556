//! Web API module for Hermes
//!
//! Provides REST API endpoints for:
//! - Session lifecycle (create, start, stop, restart, logout, delete)
//! - Default and system-session flags
//! - Ownership transfer
//! - Message statistics
//! - Gateway event ingress

pub mod auth;
pub mod health;
pub mod response;
pub mod sessions;

use axum::Router;

use crate::server::AppState;

pub use health::health_routes;
pub use sessions::sessions_routes;

/// Create the API router with all endpoints.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(sessions_routes(state.clone()))
        .merge(health_routes(state))
}
