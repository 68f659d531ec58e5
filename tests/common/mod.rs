//! Common test utilities
//!
//! In-memory stand-ins for the three boundaries the monitor talks to: the
//! native status query, the aggregator, and the messaging platform.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use niward::models::{EndpointAddress, ProtocolVariant, QueryResult};
use niward::monitor::Monitor;
use niward::platform::{MessagePlatform, PlatformResult};
use niward::presentation::{StatusPayload, TemplatePresenter};
use niward::probe::{FallbackSource, ProbeClient, StatusQuery};
use niward::storage::JsonFileStore;
use niward::utils::error::{FallbackError, PlatformError, ProbeError};

pub const ALERT_CHANNEL: &str = "alerts";

/// A reachable server answer
pub fn online(players: u32, max: u32) -> QueryResult {
    QueryResult {
        reachable: true,
        player_count: players,
        max_players: max,
        latency_ms: Some(25),
        motd: "A Minecraft Server".to_string(),
        player_sample: Vec::new(),
        version: Some("1.20.4".to_string()),
    }
}

/// Native query that plays back a script; `None` steps time out
///
/// The last step repeats once the script runs out.
pub struct ScriptedQuery {
    script: Mutex<Vec<Option<QueryResult>>>,
    calls: AtomicUsize,
}

impl ScriptedQuery {
    pub fn new(script: Vec<Option<QueryResult>>) -> Arc<Self> {
        let mut script = script;
        script.reverse();
        Arc::new(Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn always(result: QueryResult) -> Arc<Self> {
        Self::new(vec![Some(result)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StatusQuery for ScriptedQuery {
    fn query(
        &self,
        _address: &EndpointAddress,
        _protocol: ProtocolVariant,
    ) -> Result<QueryResult, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let step = if script.len() > 1 {
            script.pop().flatten()
        } else {
            script.last().cloned().flatten()
        };
        step.ok_or(ProbeError::Timeout(5000))
    }
}

/// Aggregator stand-in with a fixed answer
#[derive(Default)]
pub struct FakeFallback {
    result: Option<QueryResult>,
    calls: AtomicUsize,
}

impl FakeFallback {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answering(result: QueryResult) -> Arc<Self> {
        Arc::new(Self {
            result: Some(result),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackSource for FakeFallback {
    async fn resolve(
        &self,
        _address: &EndpointAddress,
        _protocol: ProtocolVariant,
    ) -> Result<QueryResult, FallbackError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .clone()
            .ok_or_else(|| FallbackError::unavailable("aggregator down"))
    }
}

/// Aggregator stand-in that holds its answer until released
pub struct GatedFallback {
    result: QueryResult,
    entered: Notify,
    release: Notify,
}

impl GatedFallback {
    pub fn new(result: QueryResult) -> Arc<Self> {
        Arc::new(Self {
            result,
            entered: Notify::new(),
            release: Notify::new(),
        })
    }

    /// Wait until a lookup is in flight
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl FallbackSource for GatedFallback {
    async fn resolve(
        &self,
        _address: &EndpointAddress,
        _protocol: ProtocolVariant,
    ) -> Result<QueryResult, FallbackError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.result.clone())
    }
}

/// A message sent through the fake platform
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub channel: String,
    pub id: String,
    pub title: String,
}

/// Messaging platform that keeps everything in memory
#[derive(Default)]
pub struct FakePlatform {
    next_id: AtomicUsize,
    sent: Mutex<Vec<SentMessage>>,
    edits: Mutex<Vec<String>>,
    pins: Mutex<Vec<String>>,
    deleted: Mutex<HashSet<String>>,
    locked_channels: Mutex<HashSet<String>>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Simulate someone deleting a message
    pub fn delete(&self, id: &str) {
        self.deleted.lock().unwrap().insert(id.to_string());
    }

    /// Refuse every operation in `channel`
    pub fn lock_channel(&self, channel: &str) {
        self.locked_channels
            .lock()
            .unwrap()
            .insert(channel.to_string());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, channel: &str) -> Vec<SentMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.channel == channel)
            .collect()
    }

    pub fn edits(&self) -> Vec<String> {
        self.edits.lock().unwrap().clone()
    }

    pub fn pins(&self) -> Vec<String> {
        self.pins.lock().unwrap().clone()
    }

    fn check_channel(&self, channel: &str) -> PlatformResult<()> {
        if self.locked_channels.lock().unwrap().contains(channel) {
            return Err(PlatformError::PermissionDenied(channel.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessagePlatform for FakePlatform {
    fn name(&self) -> &str {
        "fake"
    }

    async fn send_message(&self, channel: &str, payload: &StatusPayload) -> PlatformResult<String> {
        self.check_channel(channel)?;
        let id = format!("msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.sent.lock().unwrap().push(SentMessage {
            channel: channel.to_string(),
            id: id.clone(),
            title: payload.title.clone(),
        });
        Ok(id)
    }

    async fn edit_message(
        &self,
        channel: &str,
        message: &str,
        _payload: &StatusPayload,
    ) -> PlatformResult<()> {
        self.check_channel(channel)?;
        if self.deleted.lock().unwrap().contains(message) {
            return Err(PlatformError::MessageNotFound(message.to_string()));
        }
        self.edits.lock().unwrap().push(message.to_string());
        Ok(())
    }

    async fn pin_message(&self, _channel: &str, message: &str) -> PlatformResult<()> {
        self.pins.lock().unwrap().push(message.to_string());
        Err(PlatformError::PermissionDenied("pinning not allowed".to_string()))
    }
}

/// Monitor wired to fakes, with stores under `dir` and no inter-endpoint delay
pub fn monitor(
    dir: &Path,
    query: Arc<ScriptedQuery>,
    fallback: Arc<dyn FallbackSource>,
    platform: Arc<FakePlatform>,
    cache_ttl: Duration,
) -> Monitor {
    Monitor::new(
        ProbeClient::new(query, Duration::from_secs(1)),
        fallback,
        platform,
        Arc::new(TemplatePresenter::new().unwrap()),
        JsonFileStore::new(dir.join("servers.json")),
        JsonFileStore::new(dir.join("stats.json")),
    )
    .with_endpoint_delay(Duration::ZERO)
    .with_cache_ttl(cache_ttl)
    .with_alert_channel(Some(ALERT_CHANNEL.to_string()))
}
