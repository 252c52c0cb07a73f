//! Target monitoring endpoints

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Serialize;

use crate::{
    HealthSnapshot,
    actors::messages::MonitorState,
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::{Envelope, IntervalRequest, IntervalResponse, LifecycleResponse},
    },
    registry::{Dashboard, TargetSummary},
};

/// GET /api/monitoring/dashboard
///
/// Checks every target now; a failing target only affects its own entry
pub async fn dashboard(State(state): State<ApiState>) -> Json<Envelope<Dashboard>> {
    Json(Envelope::ok(state.registry.dashboard().await))
}

/// GET /api/monitoring/targets
pub async fn list_targets(State(state): State<ApiState>) -> Json<Envelope<Vec<TargetSummary>>> {
    Json(Envelope::ok(state.registry.summaries().await))
}

#[derive(Debug, Serialize)]
pub struct TargetStatus {
    target_id: String,
    state: MonitorState,
    last_status: Option<HealthSnapshot>,
}

/// GET /api/monitoring/targets/:id
pub async fn get_target(
    State(state): State<ApiState>,
    Path(target_id): Path<String>,
) -> ApiResult<Json<Envelope<TargetStatus>>> {
    let last_status = state.registry.last_status(&target_id).await?;
    let monitor_state = state.registry.state(&target_id).await?;

    Ok(Json(Envelope::ok(TargetStatus {
        target_id,
        state: monitor_state,
        last_status,
    })))
}

/// POST /api/monitoring/targets/:id/check
pub async fn check_target(
    State(state): State<ApiState>,
    Path(target_id): Path<String>,
) -> ApiResult<Json<Envelope<HealthSnapshot>>> {
    let snapshot = state.registry.check(&target_id).await?;
    Ok(Json(Envelope::ok(snapshot)))
}

/// POST /api/monitoring/targets/:id/start
pub async fn start_target(
    State(state): State<ApiState>,
    Path(target_id): Path<String>,
) -> ApiResult<Json<Envelope<LifecycleResponse>>> {
    let changed = state.registry.start(&target_id).await?;
    Ok(Json(Envelope::ok(LifecycleResponse {
        target_id,
        state: MonitorState::Running,
        changed,
    })))
}

/// POST /api/monitoring/targets/:id/interval
pub async fn update_interval(
    State(state): State<ApiState>,
    Path(target_id): Path<String>,
    request: Result<Json<IntervalRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<IntervalResponse>>> {
    let Json(request) = request?;
    let interval_secs = match request.interval_secs {
        Some(secs) if secs > 0 => secs,
        _ => {
            return Err(ApiError::InvalidRequest(
                "interval_secs must be a positive number of seconds".to_string(),
            ));
        }
    };

    state
        .registry
        .update_interval(&target_id, interval_secs)
        .await?;

    Ok(Json(Envelope::ok(IntervalResponse {
        target_id,
        interval_secs,
    })))
}

/// POST /api/monitoring/targets/:id/stop
pub async fn stop_target(
    State(state): State<ApiState>,
    Path(target_id): Path<String>,
) -> ApiResult<Json<Envelope<LifecycleResponse>>> {
    let changed = state.registry.stop(&target_id).await?;
    Ok(Json(Envelope::ok(LifecycleResponse {
        target_id,
        state: MonitorState::Stopped,
        changed,
    })))
}
