// Core data structures for the niward monitor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Network address of a monitored game server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointAddress {
    pub host: String,
    pub port: u16,
}

impl EndpointAddress {
    /// Create an address; the host is normalized to lowercase
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into().trim().to_ascii_lowercase(),
            port,
        }
    }

    /// Deterministic key used by the cache and the statistics store
    pub fn key(&self) -> EndpointKey {
        EndpointKey(format!("{}:{}", self.host, self.port))
    }
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Stable identifier for an endpoint, derived from `(host, port)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointKey(String);

impl EndpointKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Game protocol an endpoint speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProtocolVariant {
    #[default]
    Java,
    Bedrock,
    /// Serves both editions; Java is queried first
    Both,
}

impl ProtocolVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Java => "Java",
            Self::Bedrock => "Bedrock",
            Self::Both => "Both",
        }
    }
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational state of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerState {
    Online,
    /// Booting or suspended; reachable but not serving players yet
    Standby,
    Offline,
    Maintenance,
}

impl ServerState {
    pub const ALL: [ServerState; 4] = [
        ServerState::Online,
        ServerState::Standby,
        ServerState::Offline,
        ServerState::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Standby => "standby",
            Self::Offline => "offline",
            Self::Maintenance => "maintenance",
        }
    }

    /// Label shown in status messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Online => "🟢 Online",
            Self::Standby => "🟡 Standby",
            Self::Offline => "🔴 Offline",
            Self::Maintenance => "🔧 Maintenance",
        }
    }

    /// Embed colour
    pub fn color(&self) -> u32 {
        match self {
            Self::Online => 0x00ff00,
            Self::Standby => 0xffa500,
            Self::Offline => 0xff0000,
            Self::Maintenance => 0x3498db,
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw answer from the native probe or the fallback aggregator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub reachable: bool,
    pub player_count: u32,
    pub max_players: u32,
    /// Round-trip time; the aggregator does not report one
    pub latency_ms: Option<u64>,
    pub motd: String,
    /// Names of a few connected players, as advertised by the server
    pub player_sample: Vec<String>,
    pub version: Option<String>,
}

/// Where a classification's data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Probe,
    Fallback,
    /// Maintenance override or both sources failed
    None,
}

/// Computed state of an endpoint at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub state: ServerState,
    pub player_count: u32,
    pub max_players: u32,
    pub latency_ms: Option<u64>,
    pub motd: String,
    pub player_sample: Vec<String>,
    pub version: Option<String>,
    pub source: ResultSource,
    pub captured_at: DateTime<Utc>,
}

impl Classification {
    /// Classification carrying no probe data
    pub fn bare(state: ServerState) -> Self {
        Self {
            state,
            player_count: 0,
            max_players: 0,
            latency_ms: None,
            motd: String::new(),
            player_sample: Vec::new(),
            version: None,
            source: ResultSource::None,
            captured_at: Utc::now(),
        }
    }

    /// Classification that keeps the probe fields
    pub fn from_query(state: ServerState, query: QueryResult, source: ResultSource) -> Self {
        Self {
            state,
            player_count: query.player_count,
            max_players: query.max_players,
            latency_ms: query.latency_ms,
            motd: query.motd,
            player_sample: query.player_sample,
            version: query.version,
            source,
            captured_at: Utc::now(),
        }
    }
}

/// A registered endpoint and the status message that mirrors it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Identifier of the user who registered the endpoint
    pub owner_id: String,
    pub address: EndpointAddress,
    #[serde(default)]
    pub protocol: ProtocolVariant,
    /// Display customization; interpreted only by the presenter
    #[serde(default)]
    pub display: serde_json::Value,
    /// Channel the status message lives in
    pub channel_ref: Option<String>,
    /// Status message currently mirroring this endpoint
    #[serde(default)]
    pub message_ref: Option<String>,
    /// `None` until the first classification
    #[serde(default)]
    pub last_known_state: Option<ServerState>,
    #[serde(default)]
    pub maintenance: bool,
    /// Destination for transition alerts; the global default applies when unset
    #[serde(default)]
    pub alert_channel: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Registration {
    pub fn new(
        owner_id: impl Into<String>,
        address: EndpointAddress,
        channel_ref: Option<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            address,
            protocol: ProtocolVariant::default(),
            display: serde_json::Value::Null,
            channel_ref,
            message_ref: None,
            last_known_state: None,
            maintenance: false,
            alert_channel: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_protocol(mut self, protocol: ProtocolVariant) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_display(mut self, display: serde_json::Value) -> Self {
        self.display = display;
        self
    }

    pub fn with_alert_channel(mut self, channel: impl Into<String>) -> Self {
        self.alert_channel = Some(channel.into());
        self
    }

    pub fn key(&self) -> EndpointKey {
        self.address.key()
    }

    /// Read a string from the display customization
    pub fn display_str(&self, field: &str) -> Option<&str> {
        self.display.get(field).and_then(|v| v.as_str())
    }
}
