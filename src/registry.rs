//! Registry of per-target monitors and the dashboard aggregator

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::{
    HealthSnapshot,
    actors::{
        messages::MonitorState,
        monitor::{MonitorContext, MonitorHandle},
    },
    channel::ConnectionState,
    collector::DeviceCollector,
    config::ResolvedTargetConfig,
    error::RegistryError,
};

pub const DEFAULT_DASHBOARD_TIMEOUT: Duration = Duration::from_secs(30);

/// One line of the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetEntry {
    Checked {
        display: String,
        state: MonitorState,
        snapshot: HealthSnapshot,
    },
    Error {
        display: String,
        error: String,
    },
}

impl TargetEntry {
    pub fn is_error(&self) -> bool {
        matches!(self, TargetEntry::Error { .. })
    }

    pub fn snapshot(&self) -> Option<&HealthSnapshot> {
        match self {
            TargetEntry::Checked { snapshot, .. } => Some(snapshot),
            TargetEntry::Error { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub targets: BTreeMap<String, TargetEntry>,
    pub channel: ConnectionState,
}

/// Overview of a registered target without triggering a check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetSummary {
    pub id: String,
    pub display: String,
    pub state: MonitorState,
    pub last_status: Option<HealthSnapshot>,
}

pub struct MonitorRegistry {
    monitors: RwLock<HashMap<String, MonitorHandle>>,
    context: MonitorContext,
    dashboard_timeout: Duration,
}

impl MonitorRegistry {
    pub fn new(context: MonitorContext) -> Self {
        Self {
            monitors: RwLock::new(HashMap::new()),
            context,
            dashboard_timeout: DEFAULT_DASHBOARD_TIMEOUT,
        }
    }

    pub fn with_dashboard_timeout(mut self, timeout: Duration) -> Self {
        self.dashboard_timeout = timeout;
        self
    }

    pub fn context(&self) -> &MonitorContext {
        &self.context
    }

    /// Spawn a stopped monitor for `config`
    #[instrument(skip_all, fields(target = %config.id))]
    pub async fn register(
        &self,
        config: ResolvedTargetConfig,
        collector: Arc<dyn DeviceCollector>,
    ) -> Result<MonitorHandle, RegistryError> {
        let mut monitors = self.monitors.write().await;

        if monitors.contains_key(&config.id) {
            warn!("target is already registered");
            return Err(RegistryError::DuplicateTarget(config.id));
        }

        self.context
            .cooldown
            .register(config.id.clone(), config.cooldown.clone());

        let id = config.id.clone();
        let handle = MonitorHandle::spawn(config, collector, self.context.clone());
        monitors.insert(id, handle.clone());

        debug!("target registered");
        Ok(handle)
    }

    async fn handle(&self, target_id: &str) -> Result<MonitorHandle, RegistryError> {
        self.monitors
            .read()
            .await
            .get(target_id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownTarget(target_id.to_string()))
    }

    async fn handles(&self) -> Vec<MonitorHandle> {
        self.monitors.read().await.values().cloned().collect()
    }

    pub async fn start(&self, target_id: &str) -> Result<bool, RegistryError> {
        self.handle(target_id).await?.start().await
    }

    pub async fn stop(&self, target_id: &str) -> Result<bool, RegistryError> {
        self.handle(target_id).await?.stop().await
    }

    /// Start every monitor; returns how many were newly started
    pub async fn start_all(&self) -> usize {
        let results = join_all(self.handles().await.iter().map(|h| async move {
            h.start()
                .await
                .inspect_err(|e| warn!("cannot start {}: {e}", h.target_id()))
        }))
        .await;

        let started = results.into_iter().filter(|r| matches!(r, Ok(true))).count();
        info!("started {started} monitor(s)");
        started
    }

    /// Stop every monitor; returns how many were running
    pub async fn stop_all(&self) -> usize {
        let results = join_all(self.handles().await.iter().map(|h| h.stop())).await;

        let stopped = results.into_iter().filter(|r| matches!(r, Ok(true))).count();
        info!("stopped {stopped} monitor(s)");
        stopped
    }

    pub async fn shutdown_all(&self) {
        let handles: Vec<MonitorHandle> =
            self.monitors.write().await.drain().map(|(_, h)| h).collect();
        join_all(handles.iter().map(|h| h.shutdown())).await;
    }

    pub async fn last_status(
        &self,
        target_id: &str,
    ) -> Result<Option<HealthSnapshot>, RegistryError> {
        Ok(self.handle(target_id).await?.last_status().await)
    }

    pub async fn state(&self, target_id: &str) -> Result<MonitorState, RegistryError> {
        Ok(self.handle(target_id).await?.state())
    }

    /// Change the polling interval; a running timer is re-armed
    pub async fn update_interval(
        &self,
        target_id: &str,
        interval_secs: u64,
    ) -> Result<(), RegistryError> {
        self.handle(target_id)
            .await?
            .update_interval(interval_secs)
            .await
    }

    /// Run an on-demand check for one target
    pub async fn check(&self, target_id: &str) -> Result<HealthSnapshot, RegistryError> {
        self.handle(target_id).await?.check_now().await
    }

    /// Registered target ids, sorted
    pub async fn targets(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.monitors.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn summaries(&self) -> Vec<TargetSummary> {
        let mut handles = self.handles().await;
        handles.sort_by(|a, b| a.target_id().cmp(b.target_id()));

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            summaries.push(TargetSummary {
                id: handle.target_id().to_string(),
                display: handle.display_name().to_string(),
                state: handle.state(),
                last_status: handle.last_status().await,
            });
        }
        summaries
    }

    /// Check every target concurrently; a slow or broken target only spoils
    /// its own entry
    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Dashboard {
        let timeout = self.dashboard_timeout;
        let handles = self.handles().await;

        let entries = join_all(handles.iter().map(|handle| async move {
            let display = handle.display_name().to_string();
            let outcome = match tokio::time::timeout(timeout, handle.check_now()).await {
                Ok(result) => result,
                Err(_) => Err(RegistryError::CheckTimeout {
                    target: handle.target_id().to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };

            let entry = match outcome {
                Ok(snapshot) => TargetEntry::Checked {
                    display,
                    state: handle.state(),
                    snapshot,
                },
                Err(e) => {
                    warn!("dashboard check failed: {e}");
                    TargetEntry::Error {
                        display,
                        error: e.to_string(),
                    }
                }
            };

            (handle.target_id().to_string(), entry)
        }))
        .await;

        let channel = self
            .context
            .dispatcher
            .as_ref()
            .map_or(ConnectionState::Disconnected, |d| d.channel().state());

        Dashboard {
            generated_at: self.context.clock.now(),
            targets: entries.into_iter().collect(),
            channel,
        }
    }
}
