//! Rate-limited notification dispatch
//!
//! Broadcasts go out one recipient at a time with a fixed pause between two
//! consecutive sends, so the upstream messaging gateway never sees a burst.
//! A failing recipient is recorded and the batch carries on; only a channel
//! that is not ready aborts the batch, before the first send.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    channel::NotificationChannel,
    clock::Clock,
    error::{ChannelNotReady, SendError},
};

pub const DEFAULT_BROADCAST_DELAY: Duration = Duration::from_millis(1000);

/// Outcome for a single recipient of a broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientResult {
    pub recipient: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Same order as the recipients passed in
    pub results: Vec<RecipientResult>,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    channel: Arc<dyn NotificationChannel>,
    clock: Arc<dyn Clock>,
    delay: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        channel: Arc<dyn NotificationChannel>,
        clock: Arc<dyn Clock>,
        delay: Duration,
    ) -> Self {
        Self {
            channel,
            clock,
            delay,
        }
    }

    pub fn channel(&self) -> &Arc<dyn NotificationChannel> {
        &self.channel
    }

    fn ensure_ready(&self) -> Result<(), ChannelNotReady> {
        if self.channel.is_ready() {
            return Ok(());
        }

        let state = self.channel.state();
        warn!("notification channel is not ready ({state})");
        Err(ChannelNotReady {
            state: state.to_string(),
        })
    }

    #[instrument(skip(self, text))]
    pub async fn send_one(&self, recipient: &str, text: &str) -> Result<(), SendError> {
        self.ensure_ready()?;

        self.channel.send(recipient, text).await.map_err(|e| {
            warn!("failed to send message to {recipient}: {e}");
            SendError::from(e)
        })?;

        debug!("message sent to {recipient}");
        Ok(())
    }

    /// Send `text` to every recipient, strictly in order
    #[instrument(skip(self, recipients, text), fields(total = recipients.len()))]
    pub async fn send_many(
        &self,
        recipients: &[String],
        text: &str,
    ) -> Result<BroadcastReport, ChannelNotReady> {
        self.ensure_ready()?;

        info!("starting broadcast to {} recipient(s)", recipients.len());

        let mut results = Vec::with_capacity(recipients.len());

        for (index, recipient) in recipients.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                self.clock.sleep(self.delay).await;
            }

            let result = match self.channel.send(recipient, text).await {
                Ok(()) => RecipientResult {
                    recipient: recipient.clone(),
                    success: true,
                    error: None,
                },
                Err(e) => {
                    warn!("failed to send message to {recipient}: {e}");
                    RecipientResult {
                        recipient: recipient.clone(),
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }

        let successful = results.iter().filter(|result| result.success).count();
        let report = BroadcastReport {
            total: recipients.len(),
            successful,
            failed: recipients.len() - successful,
            results,
        };

        info!(
            "broadcast completed: {}/{} messages sent",
            report.successful, report.total
        );

        Ok(report)
    }
}
