//! Session management endpoints.
//!
//! All routes resolve the acting tenant through `RequireAuth`; lifecycle
//! commands, flag changes, and transfers are delegated to the engine, which
//! performs ownership and quota checks itself.

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use hermes_core::{GatewayEvent, Session, SessionStats};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::api::auth::RequireAuth;
use crate::api::response::{ok, ApiResult};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Include every tenant's sessions (admin only)
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub session_name: String,
    #[serde(default)]
    pub custom_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub custom_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub target_company_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct QrResponse {
    pub qr: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SystemFlagResponse {
    pub is_system_session: bool,
}

/// GET /api/v1/sessions
async fn list_sessions(
    RequireAuth(requester): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Session>> {
    let sessions = state.controller.list(&requester, query.all).await?;
    ok(sessions)
}

/// POST /api/v1/sessions
async fn create_session(
    RequireAuth(requester): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<CreateRequest>,
) -> ApiResult<Session> {
    let session = state
        .controller
        .create(&requester, body.session_name, body.custom_name)
        .await?;
    ok(session)
}

/// POST /api/v1/sessions/:id/start
async fn start_session(
    RequireAuth(requester): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.controller.start(&requester, id).await?;
    ok(())
}

/// POST /api/v1/sessions/:id/stop
async fn stop_session(
    RequireAuth(requester): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.controller.stop(&requester, id).await?;
    ok(())
}

/// POST /api/v1/sessions/:id/restart
async fn restart_session(
    RequireAuth(requester): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.controller.restart(&requester, id).await?;
    ok(())
}

/// POST /api/v1/sessions/:id/logout
async fn logout_session(
    RequireAuth(requester): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.controller.logout(&requester, id).await?;
    ok(())
}

/// DELETE /api/v1/sessions/:id
async fn delete_session(
    RequireAuth(requester): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.controller.delete(&requester, id).await?;
    ok(())
}

/// PUT /api/v1/sessions/:id/name
async fn rename_session(
    RequireAuth(requester): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RenameRequest>,
) -> ApiResult<()> {
    state.controller.rename(&requester, id, body.custom_name).await?;
    ok(())
}

/// GET /api/v1/sessions/:id/qr
async fn get_qr(
    RequireAuth(requester): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<QrResponse> {
    let qr = state.controller.get_qr(&requester, id).await?;
    ok(QrResponse { qr })
}

/// POST /api/v1/sessions/:id/default
async fn set_default(
    RequireAuth(requester): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.enforcer.set_default(&requester, id).await?;
    ok(())
}

/// DELETE /api/v1/sessions/:id/default
async fn unset_default(
    RequireAuth(requester): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.enforcer.unset_default(&requester, id).await?;
    ok(())
}

/// POST /api/v1/sessions/:id/system
async fn toggle_system(
    RequireAuth(requester): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<SystemFlagResponse> {
    let is_system_session = state.enforcer.toggle_system_session(&requester, id).await?;
    ok(SystemFlagResponse { is_system_session })
}

/// POST /api/v1/sessions/:id/transfer
async fn transfer_session(
    RequireAuth(requester): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TransferRequest>,
) -> ApiResult<Session> {
    let session = state
        .transfer
        .transfer(&requester, id, body.target_company_id)
        .await?;
    ok(session)
}

/// GET /api/v1/sessions/stats
async fn session_stats(
    RequireAuth(requester): RequireAuth,
    State(state): State<AppState>,
) -> ApiResult<HashMap<Uuid, SessionStats>> {
    let stats = state.stats.stats_for(&requester).await?;
    ok(stats)
}

/// POST /api/v1/events — gateway push ingress.
async fn ingest_event(
    State(state): State<AppState>,
    Json(event): Json<GatewayEvent>,
) -> ApiResult<()> {
    state.ingress.handle(event).await?;
    ok(())
}

/// Create the session routes.
pub fn sessions_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/sessions", get(list_sessions).post(create_session))
        .route("/api/v1/sessions/stats", get(session_stats))
        .route("/api/v1/sessions/:id/start", post(start_session))
        .route("/api/v1/sessions/:id/stop", post(stop_session))
        .route("/api/v1/sessions/:id/restart", post(restart_session))
        .route("/api/v1/sessions/:id/logout", post(logout_session))
        .route("/api/v1/sessions/:id", delete(delete_session))
        .route("/api/v1/sessions/:id/name", put(rename_session))
        .route("/api/v1/sessions/:id/qr", get(get_qr))
        .route(
            "/api/v1/sessions/:id/default",
            post(set_default).delete(unset_default),
        )
        .route("/api/v1/sessions/:id/system", post(toggle_system))
        .route("/api/v1/sessions/:id/transfer", post(transfer_session))
        .route("/api/v1/events", post(ingest_event))
        .with_state(state)
}
