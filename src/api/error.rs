//! API error types and conversions

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::{ChannelNotReady, DispatchError, RegistryError, SendError};

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// Invalid request parameters or body
    InvalidRequest(String),

    /// Unknown target
    NotFound(String),

    /// No usable notification channel
    Unavailable(String),

    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::InvalidRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Unavailable(msg)
            | ApiError::Internal(msg) => msg,
        };

        let body = Json(json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownTarget(_) => ApiError::NotFound(err.to_string()),
            RegistryError::DuplicateTarget(_) => ApiError::InvalidRequest(err.to_string()),
            RegistryError::MonitorUnavailable(_) | RegistryError::CheckTimeout { .. } => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<ChannelNotReady> for ApiError {
    fn from(err: ChannelNotReady) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}

impl From<SendError> for ApiError {
    fn from(err: SendError) -> Self {
        match err {
            SendError::NotReady(e) => e.into(),
            SendError::Dispatch(e @ DispatchError::InvalidRecipient(_)) => {
                ApiError::InvalidRequest(e.to_string())
            }
            SendError::Dispatch(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}
