//! Health check endpoint

use axum::{Json, extract::State};
use chrono::Utc;

use crate::api::{
    state::ApiState,
    types::{Envelope, HealthResponse},
};

/// GET /api/health
pub async fn health_check(State(state): State<ApiState>) -> Json<Envelope<HealthResponse>> {
    let now = Utc::now();

    Json(Envelope::ok(HealthResponse {
        status: "ok",
        timestamp: now.to_rfc3339(),
        uptime_secs: (now - state.started_at).num_seconds(),
        targets: state.registry.targets().await.len(),
    }))
}
