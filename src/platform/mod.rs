//! Messaging platform boundary
//!
//! The monitor only needs four things from the platform hosting the status
//! messages: create, edit in place, pin, and a name for logs. Everything
//! else about the platform connection lives outside this crate.

pub mod webhook;

use async_trait::async_trait;

use crate::presentation::StatusPayload;
use crate::utils::error::PlatformError;

pub use webhook::{WebhookConfig, WebhookPlatform};

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// A platform that hosts editable messages in channels
#[async_trait]
pub trait MessagePlatform: Send + Sync {
    /// Platform name for logs
    fn name(&self) -> &str;

    /// Post a new message and return its reference
    async fn send_message(&self, channel: &str, payload: &StatusPayload) -> PlatformResult<String>;

    /// Replace the content of an existing message
    ///
    /// Fails with `PlatformError::MessageNotFound` when the message is gone.
    async fn edit_message(
        &self,
        channel: &str,
        message: &str,
        payload: &StatusPayload,
    ) -> PlatformResult<()>;

    /// Pin a message; callers treat failure as non-fatal
    async fn pin_message(&self, channel: &str, message: &str) -> PlatformResult<()>;
}
