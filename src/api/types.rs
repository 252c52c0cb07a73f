//! API request and response types

use serde::{Deserialize, Serialize};

use crate::channel::ConnectionState;

/// Success envelope; errors go through [`super::ApiError`]
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime_secs: i64,
    pub targets: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatusResponse {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub ready: bool,
}

impl From<&ConnectionState> for ChannelStatusResponse {
    fn from(state: &ConnectionState) -> Self {
        Self {
            state: state.as_str(),
            reason: match state {
                ConnectionState::Failed(reason) => Some(reason.clone()),
                _ => None,
            },
            ready: *state == ConnectionState::Ready,
        }
    }
}

/// Body of `POST /api/notify/send`
///
/// Fields are optional so a missing one is reported as a bad request with the
/// usual envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendRequest {
    pub recipient: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BroadcastRequest {
    #[serde(default)]
    pub recipients: Vec<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendResponse {
    pub recipient: String,
    pub sent: bool,
}

/// Body of `POST /api/monitoring/targets/:id/interval`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntervalRequest {
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntervalResponse {
    pub target_id: String,
    pub interval_secs: u64,
}

/// Result of `start`/`stop`; `changed` is false when it was a no-op
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleResponse {
    pub target_id: String,
    pub state: crate::actors::messages::MonitorState,
    pub changed: bool,
}
