//! Alert deduplication
//!
//! The tracker remembers when each `(target, kind)` pair last fired and gates
//! new candidates on the kind's cooldown window:
//!
//! ```text
//! DeviceRecovered           → always fires
//! no record                 → fires, records now
//! now - last_fired >= W     → fires, records now
//! now - last_fired <  W     → suppressed
//! ```
//!
//! It is shared by every monitor loop and by on-demand checks, so the check
//! and the record happen under one lock.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::alerts::AlertKind;

pub const DEFAULT_THRESHOLD_COOLDOWN: Duration = Duration::from_secs(1800);
pub const DEFAULT_DOWN_COOLDOWN: Duration = Duration::from_secs(3600);

/// Cooldown windows of one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownPolicy {
    /// Applies to HighCpu, HighMemory, InterfaceDown and Custom
    pub threshold: Duration,
    /// Applies to DeviceDown
    pub down: Duration,
    /// Per-kind windows taking precedence over the two above
    pub overrides: HashMap<AlertKind, Duration>,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD_COOLDOWN,
            down: DEFAULT_DOWN_COOLDOWN,
            overrides: HashMap::new(),
        }
    }
}

impl CooldownPolicy {
    pub fn window(&self, kind: &AlertKind) -> Duration {
        if *kind == AlertKind::DeviceRecovered {
            return Duration::ZERO;
        }

        if let Some(window) = self.overrides.get(kind) {
            return *window;
        }

        match kind {
            AlertKind::DeviceDown => self.down,
            _ => self.threshold,
        }
    }
}

#[derive(Debug, Default)]
pub struct CooldownTracker {
    default_policy: CooldownPolicy,
    policies: RwLock<HashMap<String, CooldownPolicy>>,
    last_fired: Mutex<HashMap<(String, AlertKind), DateTime<Utc>>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker whose unregistered targets use `policy`
    pub fn with_default_policy(policy: CooldownPolicy) -> Self {
        Self {
            default_policy: policy,
            ..Self::default()
        }
    }

    pub fn register(&self, target_id: impl Into<String>, policy: CooldownPolicy) {
        let mut policies = self
            .policies
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        policies.insert(target_id.into(), policy);
    }

    pub fn window(&self, target_id: &str, kind: &AlertKind) -> Duration {
        let policies = self
            .policies
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        policies
            .get(target_id)
            .unwrap_or(&self.default_policy)
            .window(kind)
    }

    /// Decide whether an alert may be dispatched at `now`
    ///
    /// Returns `true` and records `now` as the last firing time when allowed.
    pub fn should_fire(&self, target_id: &str, kind: &AlertKind, now: DateTime<Utc>) -> bool {
        let window = self.window(target_id, kind);
        let key = (target_id.to_string(), kind.clone());

        let mut last_fired = self
            .last_fired
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let allowed = match last_fired.get(&key) {
            _ if *kind == AlertKind::DeviceRecovered => true,
            None => true,
            Some(previous) => elapsed_at_least(*previous, now, window),
        };

        if allowed {
            last_fired.insert(key, now);
        }

        trace!(
            "{target_id}/{kind}: cooldown {}s → {}",
            window.as_secs(),
            if allowed { "fire" } else { "suppress" }
        );

        allowed
    }

    pub fn last_fired(&self, target_id: &str, kind: &AlertKind) -> Option<DateTime<Utc>> {
        let last_fired = self
            .last_fired
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        last_fired
            .get(&(target_id.to_string(), kind.clone()))
            .copied()
    }
}

fn elapsed_at_least(since: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    match (now - since).to_std() {
        Ok(elapsed) => elapsed >= window,
        // clock went backwards
        Err(_) => window.is_zero(),
    }
}
