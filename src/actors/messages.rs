//! Message types for actor communication
//!
//! Commands travel over each monitor's mpsc channel; answers come back on a
//! oneshot channel carried inside the command.

use tokio::sync::oneshot;

use crate::HealthSnapshot;

/// Commands that can be sent to a TargetMonitor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Arm the polling timer; the first check runs immediately
    ///
    /// Answers `false` when the monitor was already running.
    Start { respond_to: oneshot::Sender<bool> },

    /// Disarm the polling timer
    ///
    /// Answers `false` when the monitor was already stopped. A check that is
    /// in flight when the command arrives finishes first.
    Stop { respond_to: oneshot::Sender<bool> },

    /// Run one check right away, independent of the schedule
    CheckNow {
        respond_to: oneshot::Sender<HealthSnapshot>,
    },

    /// Change the polling interval
    ///
    /// A running monitor re-arms its timer with the new interval.
    UpdateInterval { interval_secs: u64 },

    /// Stop polling and exit the actor
    Shutdown,
}

/// Lifecycle of a monitor's schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Stopped,
    Running,
}
