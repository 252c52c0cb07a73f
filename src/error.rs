//! Error types for the monitoring engine
//!
//! Per-tick failures never escape a monitor: collector errors become offline
//! snapshots and send failures become entries in a dispatch report. Only
//! [`ChannelNotReady`], [`ConfigError`] and [`RegistryError`] reach callers.

use thiserror::Error;

/// Failure reaching or querying a device
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollectorError {
    /// Network-level failure (connect, timeout, reset)
    #[error("cannot reach device: {0}")]
    Unreachable(String),

    /// Device answered with something we could not interpret
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The poll exceeded its time budget
    #[error("poll timed out after {0}s")]
    Timeout(u64),
}

/// A single notification could not be delivered
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("invalid recipient '{0}'")]
    InvalidRecipient(String),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// The notification transport is unusable; nothing was sent
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("notification channel is not ready (state: {state})")]
pub struct ChannelNotReady {
    pub state: String,
}

/// Outcome of a single send through the dispatcher
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    #[error(transparent)]
    NotReady(#[from] ChannelNotReady),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Malformed target configuration
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("target id must not be empty")]
    EmptyId,

    #[error("target '{target}': polling interval must be greater than zero")]
    ZeroInterval { target: String },

    #[error("target '{target}': threshold for '{metric}' must be a non-negative number, got {value}")]
    InvalidThreshold {
        target: String,
        metric: String,
        value: f64,
    },

    #[error("target '{target}': unknown alert kind '{key}' in cooldown overrides")]
    UnknownAlertKind { target: String, key: String },

    #[error("target '{target}': invalid collector url '{url}': {reason}")]
    InvalidCollectorUrl {
        target: String,
        url: String,
        reason: String,
    },

    #[error("invalid notification webhook url '{url}': {reason}")]
    InvalidWebhookUrl { url: String, reason: String },

    #[error("cannot build HTTP client: {0}")]
    HttpClient(String),
}

/// Registry lookups and lifecycle operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown target '{0}'")]
    UnknownTarget(String),

    #[error("target '{0}' is already registered")]
    DuplicateTarget(String),

    #[error("monitor for target '{0}' is not running")]
    MonitorUnavailable(String),

    #[error("check for target '{target}' timed out after {timeout_ms}ms")]
    CheckTimeout { target: String, timeout_ms: u64 },
}
