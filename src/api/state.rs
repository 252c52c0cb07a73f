//! API shared state

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    api::error::{ApiError, ApiResult},
    dispatcher::NotificationDispatcher,
    registry::MonitorRegistry,
};

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<MonitorRegistry>,

    pub started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(registry: Arc<MonitorRegistry>) -> Self {
        Self {
            registry,
            started_at: Utc::now(),
        }
    }

    /// The dispatcher monitors use, if a channel is configured
    pub fn dispatcher(&self) -> ApiResult<&NotificationDispatcher> {
        self.registry
            .context()
            .dispatcher
            .as_ref()
            .ok_or_else(|| ApiError::Unavailable("no notification channel configured".to_string()))
    }
}
