//! TargetMonitor - Polls one device and raises its alerts
//!
//! ## State Machine
//!
//! ```text
//! Stopped ──Start──▶ Running ──Stop──▶ Stopped
//!            (immediate check, then every `interval`)
//! ```
//!
//! Start and Stop are idempotent. Every check, scheduled or on demand, runs
//! inside the actor loop, so two polls of the same device never overlap. A
//! timer tick that came due while a check was running is dropped, and the next
//! scheduled check waits for the following period boundary. Pending commands
//! are served before a due tick, so a Stop sent during a check stops the timer
//! before it can fire again. An on-demand check whose caller stopped waiting
//! is skipped.
//!
//! ## Check Pipeline
//!
//! ```text
//! poll collector ─(error → offline snapshot)─▶ evaluate(previous)
//!     ─▶ cooldown gate ─▶ render ─▶ dispatch ─▶ store last snapshot
//! ```

use std::future::pending;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval, interval_at};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::{
    HealthSnapshot,
    alerts::{AlertCandidate, render_alert},
    clock::Clock,
    collector::DeviceCollector,
    config::ResolvedTargetConfig,
    cooldown::CooldownTracker,
    dispatcher::NotificationDispatcher,
    error::{CollectorError, RegistryError},
    evaluator::evaluate,
};

use super::messages::{MonitorCommand, MonitorState};

/// Collaborators shared by every monitor
#[derive(Clone)]
pub struct MonitorContext {
    pub cooldown: Arc<CooldownTracker>,

    /// `None` when no notification channel is configured; alerts are then
    /// only logged
    pub dispatcher: Option<NotificationDispatcher>,

    pub clock: Arc<dyn Clock>,
}

/// Actor polling a single target
pub struct TargetMonitor {
    config: ResolvedTargetConfig,

    collector: Arc<dyn DeviceCollector>,

    context: MonitorContext,

    command_rx: mpsc::Receiver<MonitorCommand>,

    /// Shared with the handle so status reads bypass the command queue
    last_snapshot: Arc<RwLock<Option<HealthSnapshot>>>,

    running: Arc<AtomicBool>,

    /// When the last check finished; ticks scheduled before it are stale
    idle_since: Instant,
}

impl TargetMonitor {
    pub fn new(
        config: ResolvedTargetConfig,
        collector: Arc<dyn DeviceCollector>,
        context: MonitorContext,
        command_rx: mpsc::Receiver<MonitorCommand>,
    ) -> Self {
        Self {
            config,
            collector,
            context,
            command_rx,
            last_snapshot: Arc::new(RwLock::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            idle_since: Instant::now(),
        }
    }

    /// Run the actor's main loop until Shutdown or until every handle is gone
    #[instrument(skip(self), fields(target = %self.config.id))]
    pub async fn run(mut self) {
        debug!("starting target monitor");

        let mut ticker: Option<Interval> = None;

        loop {
            tokio::select! {
                biased;

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(MonitorCommand::Start { respond_to }) => {
                            let started = if ticker.is_some() {
                                info!("monitoring is already running");
                                false
                            } else {
                                info!(
                                    "monitoring started (interval {}s)",
                                    self.config.interval.as_secs_f64()
                                );
                                ticker = Some(self.arm(Instant::now()));
                                true
                            };
                            self.running.store(true, Ordering::SeqCst);
                            let _ = respond_to.send(started);
                        }

                        Some(MonitorCommand::Stop { respond_to }) => {
                            let stopped = ticker.take().is_some();
                            if stopped {
                                info!("monitoring stopped");
                            } else {
                                debug!("monitoring is not running");
                            }
                            self.running.store(false, Ordering::SeqCst);
                            let _ = respond_to.send(stopped);
                        }

                        Some(MonitorCommand::CheckNow { respond_to }) => {
                            if respond_to.is_closed() {
                                debug!("caller stopped waiting, skipping on-demand check");
                            } else {
                                debug!("received CheckNow command");
                                let snapshot = self.run_check().await;
                                let _ = respond_to.send(snapshot);
                            }
                        }

                        Some(MonitorCommand::UpdateInterval { interval_secs }) => {
                            if interval_secs == 0 {
                                warn!("ignoring zero polling interval");
                            } else {
                                debug!("updating interval to {interval_secs}s");
                                self.config.interval = Duration::from_secs(interval_secs);
                                if ticker.is_some() {
                                    ticker = Some(self.arm(Instant::now() + self.config.interval));
                                }
                            }
                        }

                        Some(MonitorCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }

                deadline = next_tick(&mut ticker) => {
                    if deadline < self.idle_since {
                        trace!("dropping tick that came due during a check");
                    } else {
                        self.run_check().await;
                    }
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        debug!("target monitor stopped");
    }

    fn arm(&self, first_tick: Instant) -> Interval {
        let mut ticker = if first_tick <= Instant::now() {
            interval(self.config.interval)
        } else {
            interval_at(first_tick, self.config.interval)
        };
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }

    /// One pass through the pipeline; always yields a snapshot
    #[instrument(skip(self), fields(target = %self.config.id))]
    async fn run_check(&mut self) -> HealthSnapshot {
        let snapshot = self.poll().await;

        let previous = self.last_snapshot.read().await.clone();
        let candidates = evaluate(&snapshot, previous.as_ref(), &self.config.thresholds);

        trace!(
            "online={} → {} candidate(s)",
            snapshot.online,
            candidates.len()
        );

        for candidate in &candidates {
            let now = self.context.clock.now();
            if !self
                .context
                .cooldown
                .should_fire(&self.config.id, &candidate.kind, now)
            {
                debug!("{} alert suppressed by cooldown", candidate.kind);
                continue;
            }

            self.dispatch(candidate, &snapshot).await;
        }

        *self.last_snapshot.write().await = Some(snapshot.clone());
        self.idle_since = Instant::now();
        snapshot
    }

    /// Query the collector, folding every failure into an offline snapshot
    async fn poll(&self) -> HealthSnapshot {
        let target_id = self.config.id.as_str();

        let result = match self.config.poll_timeout {
            Some(limit) => tokio::time::timeout(limit, self.collector.poll(target_id))
                .await
                .unwrap_or(Err(CollectorError::Timeout(limit.as_secs()))),
            None => self.collector.poll(target_id).await,
        };

        match result {
            Ok(mut snapshot) => {
                snapshot.target_id = target_id.to_string();
                snapshot.timestamp = self.context.clock.now();
                snapshot
            }
            Err(e) => {
                warn!("health check failed: {e}");
                HealthSnapshot::offline(target_id, self.context.clock.now(), e.to_string())
            }
        }
    }

    async fn dispatch(&self, candidate: &AlertCandidate, snapshot: &HealthSnapshot) {
        let Some(dispatcher) = &self.context.dispatcher else {
            info!(
                "no notification channel configured, {} alert not sent: {}",
                candidate.kind, candidate.message
            );
            return;
        };

        if self.config.recipients.is_empty() {
            debug!("no recipients configured for {} alert", candidate.kind);
            return;
        }

        let text = render_alert(candidate, snapshot, self.config.display_name());

        match dispatcher.send_many(&self.config.recipients, &text).await {
            Ok(report) => info!(
                "{} alert sent to {}/{} recipient(s)",
                candidate.kind, report.successful, report.total
            ),
            Err(e) => error!("cannot send {} alert: {e}", candidate.kind),
        }
    }
}

/// Deadline of the next scheduled tick; never resolves while stopped
async fn next_tick(ticker: &mut Option<Interval>) -> Instant {
    match ticker {
        Some(ticker) => ticker.tick().await,
        None => pending().await,
    }
}

/// Handle for controlling a TargetMonitor
///
/// Cheap to clone; every clone talks to the same actor.
#[derive(Clone, Debug)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorCommand>,

    target_id: String,

    display_name: String,

    last_snapshot: Arc<RwLock<Option<HealthSnapshot>>>,

    running: Arc<AtomicBool>,
}

impl MonitorHandle {
    /// Spawn the actor for `config` in the stopped state
    pub fn spawn(
        config: ResolvedTargetConfig,
        collector: Arc<dyn DeviceCollector>,
        context: MonitorContext,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let target_id = config.id.clone();
        let display_name = config.display_name().to_string();

        let actor = TargetMonitor::new(config, collector, context, cmd_rx);
        let last_snapshot = actor.last_snapshot.clone();
        let running = actor.running.clone();

        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            target_id,
            display_name,
            last_snapshot,
            running,
        }
    }

    /// Start scheduled polling; `Ok(false)` when it was already running
    pub async fn start(&self) -> Result<bool, RegistryError> {
        let (tx, rx) = oneshot::channel();
        self.send(MonitorCommand::Start { respond_to: tx }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Stop scheduled polling; `Ok(false)` when it was not running
    pub async fn stop(&self) -> Result<bool, RegistryError> {
        let (tx, rx) = oneshot::channel();
        self.send(MonitorCommand::Stop { respond_to: tx }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Run a check now and return its snapshot
    pub async fn check_now(&self) -> Result<HealthSnapshot, RegistryError> {
        let (tx, rx) = oneshot::channel();
        self.send(MonitorCommand::CheckNow { respond_to: tx }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    pub async fn update_interval(&self, interval_secs: u64) -> Result<(), RegistryError> {
        self.send(MonitorCommand::UpdateInterval { interval_secs })
            .await
    }

    /// Gracefully shut down the monitor
    pub async fn shutdown(&self) {
        let _ = self.sender.send(MonitorCommand::Shutdown).await;
    }

    pub async fn last_status(&self) -> Option<HealthSnapshot> {
        self.last_snapshot.read().await.clone()
    }

    pub fn state(&self) -> MonitorState {
        if self.running.load(Ordering::SeqCst) {
            MonitorState::Running
        } else {
            MonitorState::Stopped
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn send(&self, command: MonitorCommand) -> Result<(), RegistryError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RegistryError {
        RegistryError::MonitorUnavailable(self.target_id.clone())
    }
}
