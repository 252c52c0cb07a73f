//! Ad-hoc notification endpoints

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::info;

use crate::{
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::{BroadcastRequest, ChannelStatusResponse, Envelope, SendRequest, SendResponse},
    },
    channel::ConnectionState,
    dispatcher::BroadcastReport,
};

/// GET /api/notify/status
pub async fn status(State(state): State<ApiState>) -> Json<Envelope<ChannelStatusResponse>> {
    let channel_state = state
        .dispatcher()
        .map_or(ConnectionState::Disconnected, |d| d.channel().state());

    Json(Envelope::ok(ChannelStatusResponse::from(&channel_state)))
}

fn required(field: Option<String>, name: &str) -> ApiResult<String> {
    field
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidRequest(format!("{name} is required")))
}

/// POST /api/notify/send
pub async fn send(
    State(state): State<ApiState>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<SendResponse>>> {
    let Json(request) = body?;
    let recipient = required(request.recipient, "recipient")?;
    let message = required(request.message, "message")?;

    state.dispatcher()?.send_one(&recipient, &message).await?;

    info!("ad-hoc message sent to {recipient}");
    Ok(Json(Envelope::ok(SendResponse {
        recipient,
        sent: true,
    })))
}

/// POST /api/notify/broadcast
pub async fn broadcast(
    State(state): State<ApiState>,
    body: Result<Json<BroadcastRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<BroadcastReport>>> {
    let Json(request) = body?;
    if request.recipients.is_empty() {
        return Err(ApiError::InvalidRequest(
            "recipients must be a non-empty list".to_string(),
        ));
    }
    let message = required(request.message, "message")?;

    let report = state
        .dispatcher()?
        .send_many(&request.recipients, &message)
        .await?;

    Ok(Json(Envelope::ok(report)))
}
