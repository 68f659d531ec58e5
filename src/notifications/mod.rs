//! Transition alerts
//!
//! When an endpoint changes state the monitor asks the
//! [`NotificationDispatcher`] to post an alert. Delivery is best-effort:
//! a missing or dangling destination is a logged no-op and any platform
//! failure is logged and reported in the returned [`DeliveryStatus`], never
//! propagated. One endpoint's alert can therefore never abort the pass for
//! the others.
//!
//! The destination is the registration's own alert channel, or the global
//! default when the registration has none.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::models::{Registration, ServerState};
use crate::platform::MessagePlatform;
use crate::presentation::Presenter;
use crate::utils::error::PlatformError;

/// How an alert attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOutcome {
    Delivered,
    /// No destination configured, or it no longer resolves
    Skipped,
    Failed,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

/// Response from sending a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStatus {
    pub outcome: DeliveryOutcome,
    /// Destination channel, when one was resolved
    pub channel: Option<String>,
    /// Optional message about the delivery
    pub message: Option<String>,
    /// Timestamp of delivery attempt
    pub timestamp: DateTime<Utc>,
}

impl DeliveryStatus {
    fn new(outcome: DeliveryOutcome, channel: Option<&str>, message: Option<String>) -> Self {
        Self {
            outcome,
            channel: channel.map(str::to_string),
            message,
            timestamp: Utc::now(),
        }
    }

    pub fn delivered(channel: &str, message_ref: String) -> Self {
        Self::new(DeliveryOutcome::Delivered, Some(channel), Some(message_ref))
    }

    pub fn skipped(channel: Option<&str>, reason: impl Into<String>) -> Self {
        Self::new(DeliveryOutcome::Skipped, channel, Some(reason.into()))
    }

    pub fn failed(channel: &str, reason: impl Into<String>) -> Self {
        Self::new(DeliveryOutcome::Failed, Some(channel), Some(reason.into()))
    }

    pub fn is_delivered(&self) -> bool {
        self.outcome == DeliveryOutcome::Delivered
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.outcome.as_str().to_uppercase())?;
        if let Some(channel) = &self.channel {
            write!(f, " {channel}")?;
        }
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

/// Posts transition alerts through the messaging platform
pub struct NotificationDispatcher {
    platform: Arc<dyn MessagePlatform>,
    presenter: Arc<dyn Presenter>,
    default_channel: Option<String>,
}

impl NotificationDispatcher {
    pub fn new(platform: Arc<dyn MessagePlatform>, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            platform,
            presenter,
            default_channel: None,
        }
    }

    /// Set the destination used when a registration has none
    pub fn with_default_channel(mut self, channel: Option<String>) -> Self {
        self.default_channel = channel;
        self
    }

    /// Alert that `registration` moved from `old` to `new`
    pub async fn send(
        &self,
        registration: &Registration,
        old: ServerState,
        new: ServerState,
    ) -> DeliveryStatus {
        let Some(channel) = registration
            .alert_channel
            .as_deref()
            .or(self.default_channel.as_deref())
        else {
            tracing::debug!(
                owner = %registration.owner_id,
                "No alert destination configured, skipping notification"
            );
            return DeliveryStatus::skipped(None, "no alert destination configured");
        };

        let payload = self.presenter.render_transition(registration, old, new);

        match self.platform.send_message(channel, &payload).await {
            Ok(message_ref) => {
                tracing::info!(
                    owner = %registration.owner_id,
                    endpoint = %registration.address,
                    from = %old,
                    to = %new,
                    "Transition alert sent"
                );
                DeliveryStatus::delivered(channel, message_ref)
            }
            Err(PlatformError::ChannelNotFound(reason)) => {
                tracing::debug!(
                    owner = %registration.owner_id,
                    reason = %reason,
                    "Alert destination no longer resolves, skipping notification"
                );
                DeliveryStatus::skipped(Some(channel), reason)
            }
            Err(e) => {
                tracing::warn!(
                    owner = %registration.owner_id,
                    platform = self.platform.name(),
                    error = %e,
                    "Failed to send transition alert"
                );
                DeliveryStatus::failed(channel, e.to_string())
            }
        }
    }
}
