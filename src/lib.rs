pub mod actors;
pub mod alerts;
#[cfg(feature = "api")]
pub mod api;
pub mod channel;
pub mod clock;
pub mod collector;
pub mod config;
pub mod cooldown;
pub mod dispatcher;
pub mod error;
pub mod evaluator;
pub mod registry;
pub mod util;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known metric names produced by collectors.
pub mod metrics {
    pub const CPU_LOAD: &str = "cpu_load";
    pub const MEMORY_USAGE: &str = "memory_usage";
    pub const INTERFACES_TOTAL: &str = "interfaces_total";
    pub const INTERFACES_RUNNING: &str = "interfaces_running";
    pub const INTERFACES_DISABLED: &str = "interfaces_disabled";
    pub const ACTIVE_USERS: &str = "active_users";
}

/// One point-in-time health reading of a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub target_id: String,
    pub timestamp: DateTime<Utc>,
    pub online: bool,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    /// Descriptive attributes (board name, firmware version, uptime, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub info: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthSnapshot {
    pub fn online(target_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            target_id: target_id.into(),
            timestamp,
            online: true,
            metrics: BTreeMap::new(),
            info: BTreeMap::new(),
            error: None,
        }
    }

    pub fn offline(
        target_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            timestamp,
            online: false,
            metrics: BTreeMap::new(),
            info: BTreeMap::new(),
            error: Some(error.into()),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn with_info(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.info.insert(name.into(), value.into());
        self
    }

    /// Value of a metric; missing and non-finite values read as `0`.
    pub fn metric(&self, name: &str) -> f64 {
        match self.metrics.get(name) {
            Some(value) if value.is_finite() => *value,
            _ => 0.0,
        }
    }

    pub fn info(&self, name: &str) -> Option<&str> {
        self.info.get(name).map(String::as_str)
    }
}
