//! Alert candidates and their rendered notification text

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{HealthSnapshot, metrics};

/// What condition an alert describes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    DeviceDown,
    DeviceRecovered,
    HighCpu,
    HighMemory,
    InterfaceDown,
    /// Threshold on a metric without a dedicated kind
    Custom(String),
}

impl AlertKind {
    /// Kind raised when `metric` crosses its threshold
    pub fn for_metric(metric: &str) -> AlertKind {
        match metric {
            metrics::CPU_LOAD => AlertKind::HighCpu,
            metrics::MEMORY_USAGE => AlertKind::HighMemory,
            other => AlertKind::Custom(other.to_string()),
        }
    }

    /// Stable textual key, used in configuration and logs
    pub fn key(&self) -> String {
        match self {
            AlertKind::DeviceDown => "device_down".to_string(),
            AlertKind::DeviceRecovered => "device_recovered".to_string(),
            AlertKind::HighCpu => "high_cpu".to_string(),
            AlertKind::HighMemory => "high_memory".to_string(),
            AlertKind::InterfaceDown => "interface_down".to_string(),
            AlertKind::Custom(metric) => format!("custom:{metric}"),
        }
    }

    /// Parse a key produced by [`AlertKind::key`]
    pub fn from_key(key: &str) -> Option<AlertKind> {
        match key {
            "device_down" => Some(AlertKind::DeviceDown),
            "device_recovered" => Some(AlertKind::DeviceRecovered),
            "high_cpu" => Some(AlertKind::HighCpu),
            "high_memory" => Some(AlertKind::HighMemory),
            "interface_down" => Some(AlertKind::InterfaceDown),
            other => other
                .strip_prefix("custom:")
                .filter(|metric| !metric.is_empty())
                .map(|metric| AlertKind::Custom(metric.to_string())),
        }
    }

    /// `true` for alerts raised by a metric limit rather than a state change
    pub fn is_threshold(&self) -> bool {
        matches!(
            self,
            AlertKind::HighCpu
                | AlertKind::HighMemory
                | AlertKind::InterfaceDown
                | AlertKind::Custom(_)
        )
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Alert condition detected by evaluation, not yet filtered by cooldown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCandidate {
    pub kind: AlertKind,
    pub target_id: String,
    pub severity: Severity,
    pub message: String,
    pub generated_at: DateTime<Utc>,
}

/// Render the notification text for an approved candidate
///
/// Online snapshots get a resource summary, offline ones the error and a call
/// to action.
pub fn render_alert(
    candidate: &AlertCandidate,
    snapshot: &HealthSnapshot,
    display: &str,
) -> String {
    let mut message = format!("🚨 *ALERT: {display}*\n\n");

    if !snapshot.online {
        message.push_str("❌ *Status:* OFFLINE\n");
        let error = snapshot.error.as_deref().unwrap_or("unknown error");
        message.push_str(&format!("⚠️ *Error:* {error}\n"));
        message.push_str(&format!("⏰ *Time:* {}\n\n", format_time(snapshot.timestamp)));
        message.push_str("Please check the device as soon as possible!");
        return message;
    }

    if candidate.kind == AlertKind::DeviceRecovered {
        message.push_str("✅ *Status:* Back online\n");
    } else {
        message.push_str("✅ *Status:* Online\n");
    }

    let details = [
        ("🔧 *Device:*", "board_name"),
        ("📊 *Version:*", "version"),
        ("⏱️ *Uptime:*", "uptime"),
        ("📍 *Location:*", "location"),
    ];
    for (label, key) in details {
        if let Some(value) = snapshot.info(key) {
            message.push_str(&format!("{label} {value}\n"));
        }
    }

    if !snapshot.metrics.is_empty() {
        message.push_str("\n*Resources:*\n");
        if snapshot.metrics.contains_key(metrics::CPU_LOAD) {
            message.push_str(&format!("🖥️ CPU: {}%\n", snapshot.metric(metrics::CPU_LOAD)));
        }
        if snapshot.metrics.contains_key(metrics::MEMORY_USAGE) {
            message.push_str(&format!(
                "💾 Memory: {}%\n",
                snapshot.metric(metrics::MEMORY_USAGE)
            ));
        }
        if snapshot.metrics.contains_key(metrics::INTERFACES_TOTAL) {
            message.push_str(&format!(
                "🔌 Interfaces: {}/{} running\n",
                snapshot.metric(metrics::INTERFACES_RUNNING),
                snapshot.metric(metrics::INTERFACES_TOTAL)
            ));
        }
        if snapshot.metrics.contains_key(metrics::ACTIVE_USERS) {
            message.push_str(&format!(
                "👥 Active Users: {}\n",
                snapshot.metric(metrics::ACTIVE_USERS)
            ));
        }
    }

    if candidate.kind != AlertKind::DeviceRecovered {
        message.push_str(&format!("\n⚠️ *Warning:*\n{}\n", candidate.message));
    }

    message.push_str(&format!("\n⏰ *Time:* {}", format_time(snapshot.timestamp)));
    message
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
