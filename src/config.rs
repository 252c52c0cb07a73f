use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::Url;
use tracing::trace;

use crate::{
    alerts::AlertKind,
    channel::WebhookConfig,
    collector::{CollectorConfig, DeviceCollector, HttpCollector},
    cooldown::CooldownPolicy,
    error::ConfigError,
    evaluator::Thresholds,
    metrics,
};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub targets: Vec<TargetConfig>,

    pub notification: Option<NotificationConfig>,

    pub api: Option<ApiSettings>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct NotificationConfig {
    pub webhook: WebhookConfig,

    /// Pause between two consecutive messages of a broadcast
    #[serde(default = "default_broadcast_delay_ms")]
    pub broadcast_delay_ms: u64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSettings {
    pub addr: Option<IpAddr>,
    pub port: Option<u16>,
    pub token: Option<String>,
    /// Per-target budget for an on-demand dashboard check
    #[serde(default = "default_dashboard_timeout")]
    pub dashboard_timeout_secs: u64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct TargetConfig {
    pub id: String,
    pub display: Option<String>,
    pub collector: CollectorConfig,
    /// Polling interval in seconds
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Upper bound for a single poll; a slower device counts as offline
    pub poll_timeout: Option<u64>,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub cooldown: CooldownConfig,
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Start polling as soon as the hub is up
    #[serde(default = "default_autostart")]
    pub autostart: bool,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ThresholdConfig {
    /// metric → limit; defaults to cpu 80 / memory 85 when omitted
    pub limits: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub interface_down_alert: bool,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CooldownConfig {
    #[serde(default = "default_threshold_cooldown")]
    pub threshold_secs: u64,
    #[serde(default = "default_down_cooldown")]
    pub down_secs: u64,
    /// alert kind key (`high_cpu`, `custom:temperature`, ...) → seconds
    #[serde(default)]
    pub overrides: BTreeMap<String, u64>,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            threshold_secs: default_threshold_cooldown(),
            down_secs: default_down_cooldown(),
            overrides: BTreeMap::new(),
        }
    }
}

/// Validated target configuration the monitors run on
#[derive(Debug, Clone)]
pub struct ResolvedTargetConfig {
    pub id: String,
    pub display: Option<String>,
    pub interval: Duration,
    pub poll_timeout: Option<Duration>,
    pub thresholds: Thresholds,
    pub cooldown: CooldownPolicy,
    pub recipients: Vec<String>,
    pub autostart: bool,
}

impl ResolvedTargetConfig {
    /// Target with default thresholds and cooldowns and no recipients
    pub fn new(id: impl Into<String>, interval: Duration) -> Self {
        Self {
            id: id.into(),
            display: None,
            interval,
            poll_timeout: None,
            thresholds: Thresholds {
                limits: default_limits(),
                interface_down_alert: false,
            },
            cooldown: CooldownPolicy::default(),
            recipients: Vec::new(),
            autostart: true,
        }
    }

    pub fn display_name(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.id)
    }
}

impl TargetConfig {
    /// Validate the target and build its collector
    pub fn resolve(&self) -> Result<(ResolvedTargetConfig, Arc<dyn DeviceCollector>), ConfigError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(ConfigError::EmptyId);
        }

        if self.interval == 0 {
            return Err(ConfigError::ZeroInterval {
                target: id.to_string(),
            });
        }

        let limits = self.thresholds.limits.clone().unwrap_or_else(default_limits);
        if let Some((metric, value)) = limits
            .iter()
            .find(|(_, value)| !value.is_finite() || **value < 0.0)
        {
            return Err(ConfigError::InvalidThreshold {
                target: id.to_string(),
                metric: metric.clone(),
                value: *value,
            });
        }

        let mut overrides = HashMap::new();
        for (key, secs) in &self.cooldown.overrides {
            let kind = AlertKind::from_key(key).ok_or_else(|| ConfigError::UnknownAlertKind {
                target: id.to_string(),
                key: key.clone(),
            })?;
            overrides.insert(kind, Duration::from_secs(*secs));
        }

        let collector = build_collector(id, &self.collector)?;

        let resolved = ResolvedTargetConfig {
            id: id.to_string(),
            display: self.display.clone(),
            interval: Duration::from_secs(self.interval),
            poll_timeout: self.poll_timeout.map(Duration::from_secs),
            thresholds: Thresholds {
                limits,
                interface_down_alert: self.thresholds.interface_down_alert,
            },
            cooldown: CooldownPolicy {
                threshold: Duration::from_secs(self.cooldown.threshold_secs),
                down: Duration::from_secs(self.cooldown.down_secs),
                overrides,
            },
            recipients: self.recipients.clone(),
            autostart: self.autostart,
        };

        Ok((resolved, collector))
    }
}

fn build_collector(
    target: &str,
    config: &CollectorConfig,
) -> Result<Arc<dyn DeviceCollector>, ConfigError> {
    match config {
        CollectorConfig::Http {
            url,
            token,
            timeout_secs,
        } => {
            let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidCollectorUrl {
                target: target.to_string(),
                url: url.clone(),
                reason: e.to_string(),
            })?;

            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidCollectorUrl {
                    target: target.to_string(),
                    url: url.clone(),
                    reason: format!("unsupported scheme '{}'", parsed.scheme()),
                });
            }

            let collector =
                HttpCollector::new(parsed, token.clone(), Duration::from_secs(*timeout_secs))?;
            Ok(Arc::new(collector))
        }
    }
}

fn default_limits() -> BTreeMap<String, f64> {
    BTreeMap::from([
        (metrics::CPU_LOAD.to_string(), 80.0),
        (metrics::MEMORY_USAGE.to_string(), 85.0),
    ])
}

fn default_interval() -> u64 {
    300
}

fn default_autostart() -> bool {
    true
}

fn default_broadcast_delay_ms() -> u64 {
    1000
}

fn default_dashboard_timeout() -> u64 {
    30
}

fn default_threshold_cooldown() -> u64 {
    1800
}

fn default_down_cooldown() -> u64 {
    3600
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("cannot read config file {path}"))?;
    serde_json::from_str(&file_content)
        .with_context(|| format!("invalid configuration file {path}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
