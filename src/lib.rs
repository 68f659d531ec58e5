//! niward - Game server status monitor
//!
//! Keeps one live status message per registered game server endpoint and
//! alerts when an endpoint changes state.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`monitor`] - The reconciliation loop tying everything together
//! - [`probe`] - Native status queries, aggregator fallback, and classification
//! - [`cache`] - Short-lived classification cache
//! - [`stats`] - Per-endpoint uptime statistics and transition history
//! - [`notifications`] - Best-effort transition alerts
//! - [`platform`] - Messaging platform boundary and the webhook adapter
//! - [`presentation`] - Status message rendering
//! - [`storage`] - Whole-file JSON stores
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`utils`] - Address parsing and formatting helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use niward::monitor::Monitor;
//! use niward::platform::{WebhookConfig, WebhookPlatform};
//! use niward::presentation::TemplatePresenter;
//! use niward::probe::{FallbackResolver, ProbeClient};
//! use niward::storage::JsonFileStore;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let monitor = Monitor::new(
//!         ProbeClient::without_backend(Duration::from_secs(5)),
//!         Arc::new(FallbackResolver::new(Duration::from_secs(5))?),
//!         Arc::new(WebhookPlatform::new(WebhookConfig::default())?),
//!         Arc::new(TemplatePresenter::new()?),
//!         JsonFileStore::new("data/servers.json"),
//!         JsonFileStore::new("data/stats.json"),
//!     );
//!     let report = monitor.run_cycle().await;
//!     println!("checked {} endpoints", report.checked());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod notifications;
pub mod platform;
pub mod presentation;
pub mod probe;
pub mod stats;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::models::{
        Classification, EndpointAddress, EndpointKey, ProtocolVariant, QueryResult, Registration,
        ServerState,
    };
    pub use crate::monitor::{Monitor, MonitorState};
    pub use crate::platform::MessagePlatform;
    pub use crate::presentation::{Presenter, StatusPayload};
    pub use crate::probe::{FallbackSource, ProbeClient, StatusQuery};
}

// Direct re-exports for convenience
pub use models::{Classification, EndpointAddress, Registration, ServerState};
