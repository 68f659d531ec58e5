//! Webhook-backed messaging platform
//!
//! A channel reference is the webhook URL itself. Messages are created with
//! `POST {webhook}?wait=true`, which answers with the created message, and
//! edited with `PATCH {webhook}/messages/{id}`.
//!
//! Status mapping:
//!
//! | HTTP      | On create          | On edit             |
//! |-----------|--------------------|---------------------|
//! | 401, 403  | `PermissionDenied` | `PermissionDenied`  |
//! | 404       | `ChannelNotFound`  | `MessageNotFound`   |
//! | 429       | retried, then `RateLimited` | same       |
//! | 5xx       | retried, then `Server`      | same       |
//!
//! Transport failures are retried on edit. On create only connection
//! failures are retried; a create that timed out may already exist.
//!
//! Webhooks cannot pin; `pin_message` always answers `PermissionDenied`.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::{MessagePlatform, PlatformResult};
use crate::presentation::StatusPayload;
use crate::utils::error::PlatformError;

/// Webhook platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum retry attempts on 429/5xx
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff, in milliseconds
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
}

fn default_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    2
}

fn default_base_delay() -> u64 {
    1000
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            base_delay_ms: default_base_delay(),
        }
    }
}

impl WebhookConfig {
    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set backoff base delay
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

/// Which call a response answers; decides how 404 is read
#[derive(Debug, Clone, Copy)]
enum Operation {
    Create,
    Edit,
}

/// Messaging platform driven entirely through webhook URLs
pub struct WebhookPlatform {
    config: WebhookConfig,
    client: Client,
}

impl WebhookPlatform {
    /// Create a new webhook platform
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Http` if the HTTP client cannot be created
    pub fn new(config: WebhookConfig) -> PlatformResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn parse_channel(channel: &str) -> PlatformResult<Url> {
        let url = Url::parse(channel)
            .map_err(|e| PlatformError::ChannelNotFound(format!("{channel}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PlatformError::ChannelNotFound(format!(
                "{channel}: not an http(s) webhook"
            )));
        }
        Ok(url)
    }

    fn create_url(channel: &str) -> PlatformResult<Url> {
        let mut url = Self::parse_channel(channel)?;
        url.query_pairs_mut().append_pair("wait", "true");
        Ok(url)
    }

    fn message_url(channel: &str, message: &str) -> PlatformResult<Url> {
        let mut url = Self::parse_channel(channel)?;
        url.path_segments_mut()
            .map_err(|_| PlatformError::ChannelNotFound(channel.to_string()))?
            .pop_if_empty()
            .push("messages")
            .push(message);
        Ok(url)
    }

    fn build_body(payload: &StatusPayload) -> serde_json::Value {
        serde_json::json!({
            "embeds": [payload.to_embed()],
        })
    }

    fn map_status(status: StatusCode, operation: Operation, target: &str) -> PlatformError {
        match status.as_u16() {
            401 | 403 => PlatformError::PermissionDenied(target.to_string()),
            404 => match operation {
                Operation::Create => PlatformError::ChannelNotFound(target.to_string()),
                Operation::Edit => PlatformError::MessageNotFound(target.to_string()),
            },
            429 => PlatformError::RateLimited,
            code => PlatformError::Server(code),
        }
    }

    /// Send the request with retry logic
    async fn send_with_retry(
        &self,
        method: Method,
        url: &Url,
        body: &serde_json::Value,
        operation: Operation,
    ) -> PlatformResult<reqwest::Response> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: base, 2×base, 4×base...
                let delay = self.config.base_delay_ms * 2_u64.pow(attempt - 1);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                tracing::debug!(
                    "Retrying webhook request (attempt {}/{})",
                    attempt + 1,
                    self.config.max_retries + 1
                );
            }

            let response = match self
                .client
                .request(method.clone(), url.clone())
                .json(body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    // A create that may have reached the server is not resent.
                    if matches!(operation, Operation::Create) && !e.is_connect() {
                        return Err(PlatformError::Http(e));
                    }
                    last_error = Some(PlatformError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let error = Self::map_status(status, operation, url.path());
            if !error.is_recoverable() {
                return Err(error);
            }
            last_error = Some(error);
        }

        Err(last_error.unwrap_or(PlatformError::RateLimited))
    }
}

#[async_trait]
impl MessagePlatform for WebhookPlatform {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send_message(&self, channel: &str, payload: &StatusPayload) -> PlatformResult<String> {
        let url = Self::create_url(channel)?;
        let response = self
            .send_with_retry(Method::POST, &url, &Self::build_body(payload), Operation::Create)
            .await?;

        let created: CreatedMessage = response
            .json()
            .await
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;

        tracing::debug!(message = %created.id, "Webhook message created");
        Ok(created.id)
    }

    async fn edit_message(
        &self,
        channel: &str,
        message: &str,
        payload: &StatusPayload,
    ) -> PlatformResult<()> {
        let url = Self::message_url(channel, message)?;
        self.send_with_retry(Method::PATCH, &url, &Self::build_body(payload), Operation::Edit)
            .await?;
        Ok(())
    }

    async fn pin_message(&self, _channel: &str, message: &str) -> PlatformResult<()> {
        Err(PlatformError::PermissionDenied(format!(
            "webhooks cannot pin message {message}"
        )))
    }
}
