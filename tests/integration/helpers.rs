//! Helper types for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use netwatch::{
    HealthSnapshot,
    actors::monitor::MonitorContext,
    channel::{ConnectionState, NotificationChannel},
    clock::{Clock, ManualClock},
    collector::DeviceCollector,
    config::ResolvedTargetConfig,
    cooldown::CooldownTracker,
    dispatcher::NotificationDispatcher,
    error::{CollectorError, DispatchError},
    metrics,
    registry::MonitorRegistry,
};

/// Collector replaying a script of results; repeats the last one afterwards
pub struct ScriptedCollector {
    script: Mutex<VecDeque<Result<HealthSnapshot, CollectorError>>>,
    last: Mutex<Option<Result<HealthSnapshot, CollectorError>>>,
    delay: Duration,
    polls: AtomicUsize,
    in_flight: AtomicBool,
    overlapped: AtomicBool,
    spans: Mutex<Vec<(Instant, Instant)>>,
}

impl ScriptedCollector {
    pub fn new(script: Vec<Result<HealthSnapshot, CollectorError>>) -> Arc<Self> {
        Self::with_delay(script, Duration::ZERO)
    }

    pub fn with_delay(
        script: Vec<Result<HealthSnapshot, CollectorError>>,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            delay,
            polls: AtomicUsize::new(0),
            in_flight: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
            spans: Mutex::new(vec![]),
        })
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// `true` if two polls ever ran at the same time
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Start and end of every finished poll, in order
    pub fn spans(&self) -> Vec<(Instant, Instant)> {
        self.spans.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceCollector for ScriptedCollector {
    async fn poll(&self, target_id: &str) -> Result<HealthSnapshot, CollectorError> {
        let started = Instant::now();
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        self.polls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        let result = match next {
            Some(result) => {
                *self.last.lock().unwrap() = Some(result.clone());
                result
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Ok(HealthSnapshot::online(target_id, Utc::now()))),
        };

        self.spans.lock().unwrap().push((started, Instant::now()));
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }
}

/// Channel that records every message together with the virtual send time
pub struct RecordingChannel {
    state: Mutex<ConnectionState>,
    clock: ManualClock,
    fail_for: Vec<String>,
    sent: Mutex<Vec<SentMessage>>,
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub recipient: String,
    pub text: String,
    pub at: chrono::DateTime<Utc>,
}

impl RecordingChannel {
    pub fn new(clock: ManualClock) -> Arc<Self> {
        Self::failing_for(clock, vec![])
    }

    pub fn failing_for(clock: ManualClock, fail_for: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ConnectionState::Ready),
            clock,
            fail_for,
            sent: Mutex::new(vec![]),
        })
    }

    pub fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn state(&self) -> ConnectionState {
        self.state.lock().unwrap().clone()
    }

    async fn send(&self, recipient: &str, text: &str) -> Result<(), DispatchError> {
        if self.fail_for.iter().any(|r| r == recipient) {
            return Err(DispatchError::Delivery("gateway error".to_string()));
        }
        self.sent.lock().unwrap().push(SentMessage {
            recipient: recipient.to_string(),
            text: text.to_string(),
            at: self.clock.now(),
        });
        Ok(())
    }
}

/// Registry wired to a recording channel and a manual clock
pub struct TestHub {
    pub registry: Arc<MonitorRegistry>,
    pub channel: Arc<RecordingChannel>,
    pub clock: ManualClock,
}

impl TestHub {
    pub fn new() -> Self {
        let clock = ManualClock::default();
        Self::with_channel(clock.clone(), RecordingChannel::new(clock))
    }

    pub fn with_channel(clock: ManualClock, channel: Arc<RecordingChannel>) -> Self {
        let dispatcher = NotificationDispatcher::new(
            channel.clone(),
            Arc::new(clock.clone()),
            Duration::from_millis(1000),
        );
        let registry = MonitorRegistry::new(MonitorContext {
            cooldown: Arc::new(CooldownTracker::new()),
            dispatcher: Some(dispatcher),
            clock: Arc::new(clock.clone()),
        })
        .with_dashboard_timeout(Duration::from_millis(500));

        Self {
            registry: Arc::new(registry),
            channel,
            clock,
        }
    }
}

pub fn target_config(id: &str, recipients: &[&str]) -> ResolvedTargetConfig {
    let mut config = ResolvedTargetConfig::new(id, Duration::from_secs(300));
    config.display = Some(format!("Device {id}"));
    config.recipients = recipients.iter().map(|r| r.to_string()).collect();
    config
}

pub fn online_with_cpu(target_id: &str, cpu: f64) -> Result<HealthSnapshot, CollectorError> {
    Ok(HealthSnapshot::online(target_id, Utc::now())
        .with_metric(metrics::CPU_LOAD, cpu)
        .with_metric(metrics::MEMORY_USAGE, 40.0)
        .with_info("board_name", "CCR2004")
        .with_info("uptime", "3d4h"))
}

pub fn unreachable(reason: &str) -> Result<HealthSnapshot, CollectorError> {
    Err(CollectorError::Unreachable(reason.to_string()))
}

pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
