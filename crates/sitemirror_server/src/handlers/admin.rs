use crate::db::{SchemaReport, SchemaState};
use crate::mirror::SiteMirror;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde::Serialize;
use sitemirror_core::EditChange;
use std::sync::Arc;
use tracing::error;

/// Shared state for admin handlers
#[derive(Clone)]
pub struct AdminState {
    pub mirror: Arc<SiteMirror>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    snapshot_enabled: bool,
    git_sync_enabled: bool,
}

#[derive(Debug, Serialize)]
struct ScheduledResponse {
    scheduled: bool,
}

#[derive(Debug, Serialize)]
struct SchemaResponse {
    state: SchemaState,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<SchemaReport>,
}

/// Create admin routes
pub fn admin_routes(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/snapshot", post(schedule_snapshot))
        .route("/api/schema", get(schema_status))
        .route("/api/edits", post(record_edit))
        .with_state(state)
}

/// GET /health
async fn health(State(state): State<AdminState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        snapshot_enabled: state.mirror.writer().is_enabled(),
        git_sync_enabled: state.mirror.sync_engine().is_enabled(),
    })
}

/// POST /api/snapshot - Schedule a debounced snapshot of the database
async fn schedule_snapshot(State(state): State<AdminState>) -> impl IntoResponse {
    let scheduled = state.mirror.writer().is_enabled();
    state.mirror.schedule_snapshot();
    (StatusCode::ACCEPTED, Json(ScheduledResponse { scheduled }))
}

/// GET /api/schema - Report schema initialization progress
async fn schema_status(State(state): State<AdminState>) -> impl IntoResponse {
    let schema = state.mirror.repo().schema();
    Json(SchemaResponse {
        state: schema.state(),
        report: schema.report().map(|r| SchemaReport::clone(&r)),
    })
}

/// POST /api/edits - Persist an edit and schedule a snapshot
async fn record_edit(
    State(state): State<AdminState>,
    Json(change): Json<EditChange>,
) -> impl IntoResponse {
    match state.mirror.record_edit(&change).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(ScheduledResponse {
                scheduled: state.mirror.writer().is_enabled(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to record edit for {}: {}", change.key(), e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
