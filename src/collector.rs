//! Device collectors
//!
//! A collector turns one round-trip to a device into a [`HealthSnapshot`].
//! The engine only consumes the [`DeviceCollector`] contract; connection
//! handling stays inside each implementation.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, trace};

use crate::{
    HealthSnapshot,
    error::{CollectorError, ConfigError},
};

#[async_trait]
pub trait DeviceCollector: Send + Sync {
    /// Query the device; may take arbitrarily long and may fail
    async fn poll(&self, target_id: &str) -> Result<HealthSnapshot, CollectorError>;
}

impl std::fmt::Debug for dyn DeviceCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn DeviceCollector")
    }
}

/// Collector backend selection in the configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectorConfig {
    /// JSON status endpoint of a device agent or management gateway
    Http {
        url: String,
        token: Option<String>,
        #[serde(default = "default_http_timeout")]
        timeout_secs: u64,
    },
}

fn default_http_timeout() -> u64 {
    10
}

/// Polls a JSON status endpoint
///
/// Expected body:
///
/// ```json
/// { "metrics": { "cpu_load": 12, "memory_usage": "40" },
///   "info": { "board_name": "CCR2004", "uptime": "3d4h" } }
/// ```
///
/// Metric values may be numbers or numeric strings; anything else is ignored.
/// An explicit `"online": false` (with optional `"error"`) yields an offline
/// snapshot.
#[derive(Debug, Clone)]
pub struct HttpCollector {
    client: Client,
    url: Url,
    token: Option<String>,
    timeout_secs: u64,
}

impl HttpCollector {
    pub fn new(url: Url, token: Option<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            url,
            token,
            timeout_secs: timeout.as_secs(),
        })
    }
}

#[async_trait]
impl DeviceCollector for HttpCollector {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn poll(&self, target_id: &str) -> Result<HealthSnapshot, CollectorError> {
        trace!("requesting status");

        let mut request = self.client.get(self.url.clone());
        if let Some(token) = &self.token {
            request = request.header("X-MONITORING-SECRET", token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CollectorError::Timeout(self.timeout_secs)
            } else {
                CollectorError::Unreachable(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(CollectorError::Protocol(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CollectorError::Protocol(format!("invalid status body: {e}")))?;

        let snapshot = parse_status(target_id, &body)?;
        trace!("parsed {} metric(s)", snapshot.metrics.len());
        Ok(snapshot)
    }
}

/// Normalize a status document into a snapshot
pub fn parse_status(target_id: &str, body: &Value) -> Result<HealthSnapshot, CollectorError> {
    let Some(document) = body.as_object() else {
        return Err(CollectorError::Protocol(
            "status body is not a JSON object".to_string(),
        ));
    };

    let now = Utc::now();

    if document.get("online").and_then(Value::as_bool) == Some(false) {
        let error = document
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("device reported offline");
        return Ok(HealthSnapshot::offline(target_id, now, error));
    }

    let mut snapshot = HealthSnapshot::online(target_id, now);

    if let Some(metrics) = document.get("metrics").and_then(Value::as_object) {
        snapshot.metrics = metrics
            .iter()
            .filter_map(|(name, value)| numeric(value).map(|v| (name.clone(), v)))
            .collect::<BTreeMap<_, _>>();
    }

    if let Some(info) = document.get("info").and_then(Value::as_object) {
        snapshot.info = info
            .iter()
            .filter_map(|(name, value)| match value {
                Value::String(s) => Some((name.clone(), s.clone())),
                Value::Number(n) => Some((name.clone(), n.to_string())),
                Value::Bool(b) => Some((name.clone(), b.to_string())),
                _ => None,
            })
            .collect();
    }

    Ok(snapshot)
}

fn numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}
