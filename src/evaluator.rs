//! Threshold evaluation
//!
//! Turns a snapshot (and the one before it) into alert candidates. No I/O and
//! no state: the same inputs always produce the same candidates in the same
//! order.
//!
//! ```text
//! offline                      → [DeviceDown]               (nothing else)
//! previous offline, now online → DeviceRecovered
//! metric > limit               → HighCpu | HighMemory | Custom(metric)
//! total - running - disabled>0 → InterfaceDown
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    HealthSnapshot,
    alerts::{AlertCandidate, AlertKind, Severity},
    metrics,
};

/// Limits for a single target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// metric name → upper limit (exclusive)
    #[serde(default)]
    pub limits: BTreeMap<String, f64>,

    /// Raise `InterfaceDown` when interfaces are neither running nor disabled
    #[serde(default)]
    pub interface_down_alert: bool,
}

impl Thresholds {
    pub fn with_limit(mut self, metric: impl Into<String>, limit: f64) -> Self {
        self.limits.insert(metric.into(), limit);
        self
    }
}

pub fn evaluate(
    snapshot: &HealthSnapshot,
    previous: Option<&HealthSnapshot>,
    thresholds: &Thresholds,
) -> Vec<AlertCandidate> {
    let candidate = |kind: AlertKind, severity: Severity, message: String| AlertCandidate {
        kind,
        target_id: snapshot.target_id.clone(),
        severity,
        message,
        generated_at: snapshot.timestamp,
    };

    if !snapshot.online {
        let error = snapshot.error.as_deref().unwrap_or("unknown error");
        return vec![candidate(
            AlertKind::DeviceDown,
            Severity::Critical,
            format!("device is offline: {error}"),
        )];
    }

    let mut candidates = Vec::new();

    if previous.is_some_and(|previous| !previous.online) {
        candidates.push(candidate(
            AlertKind::DeviceRecovered,
            Severity::Info,
            "device is back online".to_string(),
        ));
    }

    for (metric, limit) in &thresholds.limits {
        let value = snapshot.metric(metric);
        if value > *limit {
            candidates.push(candidate(
                AlertKind::for_metric(metric),
                Severity::Warning,
                threshold_message(metric, value, *limit),
            ));
        }
    }

    if thresholds.interface_down_alert {
        let down = interfaces_down(snapshot);
        if down > 0 {
            candidates.push(candidate(
                AlertKind::InterfaceDown,
                Severity::Warning,
                format!("{down} interface(s) are down"),
            ));
        }
    }

    candidates
}

/// Interfaces that are neither running nor administratively disabled
///
/// Inconsistent counts from a device (more running + disabled than total)
/// read as zero.
pub fn interfaces_down(snapshot: &HealthSnapshot) -> u64 {
    let down = snapshot.metric(metrics::INTERFACES_TOTAL)
        - snapshot.metric(metrics::INTERFACES_RUNNING)
        - snapshot.metric(metrics::INTERFACES_DISABLED);

    if down > 0.0 { down.round() as u64 } else { 0 }
}

fn threshold_message(metric: &str, value: f64, limit: f64) -> String {
    match metric {
        metrics::CPU_LOAD => format!("CPU load is {value}% (threshold: {limit}%)"),
        metrics::MEMORY_USAGE => format!("Memory usage is {value}% (threshold: {limit}%)"),
        other => format!("{other} is {value} (threshold: {limit})"),
    }
}
