//! Notification transport
//!
//! A [`NotificationChannel`] delivers one text to one recipient. The channel
//! reports an explicit [`ConnectionState`]; the dispatcher refuses to send
//! unless it is `Ready`.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ConfigError, DispatchError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Authenticating,
    Ready,
    Failed(String),
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Ready => "ready",
            ConnectionState::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Failed(reason) => write!(f, "failed ({reason})"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn state(&self) -> ConnectionState;

    fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    async fn send(&self, recipient: &str, text: &str) -> Result<(), DispatchError>;
}

/// How recipients are written before they reach the transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientFormat {
    /// Phone numbers: everything but digits is dropped (`+62 812-34` → `6281234`)
    #[default]
    Phone,
    /// Passed through, surrounding whitespace trimmed
    Raw,
}

impl RecipientFormat {
    pub fn normalize(&self, recipient: &str) -> Option<String> {
        let normalized: String = match self {
            RecipientFormat::Phone => recipient.chars().filter(char::is_ascii_digit).collect(),
            RecipientFormat::Raw => recipient.trim().to_string(),
        };

        (!normalized.is_empty()).then_some(normalized)
    }
}

/// Webhook transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Endpoint receiving `{recipient, message, timestamp}` POSTs
    pub url: String,

    /// Optional readiness probe; a 2xx response marks the channel ready
    pub status_url: Option<String>,

    /// Sent as `Authorization: Bearer <token>`
    pub token: Option<String>,

    #[serde(default)]
    pub recipient_format: RecipientFormat,

    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
}

fn default_webhook_timeout() -> u64 {
    30
}

/// Delivers notifications to a messaging gateway over HTTP
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    client: Client,
    url: Url,
    status_url: Option<Url>,
    token: Option<String>,
    recipient_format: RecipientFormat,
    state: Arc<RwLock<ConnectionState>>,
}

impl WebhookChannel {
    pub fn new(config: &WebhookConfig) -> Result<Self, ConfigError> {
        let parse = |url: &str| {
            Url::parse(url).map_err(|e| ConfigError::InvalidWebhookUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })
        };

        let url = parse(&config.url)?;
        let status_url = config.status_url.as_deref().map(parse).transpose()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            url,
            status_url,
            token: config.token.clone(),
            recipient_format: config.recipient_format,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
        })
    }

    /// Bring the channel to `Ready`, probing the gateway when a status url is set
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn connect(&self) -> ConnectionState {
        self.set_state(ConnectionState::Authenticating);

        let state = match &self.status_url {
            None => ConnectionState::Ready,
            Some(status_url) => {
                let mut request = self.client.get(status_url.clone());
                if let Some(token) = &self.token {
                    request = request.bearer_auth(token);
                }

                match request.send().await {
                    Ok(response) if response.status().is_success() => ConnectionState::Ready,
                    Ok(response) => ConnectionState::Failed(format!(
                        "status probe returned {}",
                        response.status()
                    )),
                    Err(e) => ConnectionState::Failed(format!("status probe failed: {e}")),
                }
            }
        };

        match &state {
            ConnectionState::Ready => info!("notification channel is ready"),
            other => warn!("notification channel not ready: {other}"),
        }

        self.set_state(state.clone());
        state
    }

    pub fn disconnect(&self) {
        debug!("notification channel disconnected");
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&self, state: ConnectionState) {
        let mut current = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = state;
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn state(&self) -> ConnectionState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    #[instrument(skip(self, text))]
    async fn send(&self, recipient: &str, text: &str) -> Result<(), DispatchError> {
        let Some(normalized) = self.recipient_format.normalize(recipient) else {
            return Err(DispatchError::InvalidRecipient(recipient.to_string()));
        };

        let payload = json!({
            "recipient": normalized,
            "message": text,
            "timestamp": Utc::now().to_rfc3339(),
        });

        let mut request = self.client.post(self.url.clone()).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!("message delivered to {normalized}");
                Ok(())
            }
            Ok(response) => {
                let status = response.status();
                error!("webhook rejected message for {normalized} with status {status}");
                Err(DispatchError::Delivery(format!("gateway returned {status}")))
            }
            Err(e) => {
                error!("failed to deliver message to {normalized}: {e}");
                Err(DispatchError::Delivery(e.to_string()))
            }
        }
    }
}
