//! Aggregator lookup used when the native probe fails
//!
//! Queries a third-party status aggregator (mcsrvstat.us v3 API shape) with a
//! single bounded-timeout GET and maps the answer onto [`QueryResult`].
//! Any failure, including the aggregator reporting the server as offline,
//! surfaces as `FallbackError::Unavailable`.

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT},
    Client,
};
use serde::Deserialize;
use std::time::Duration;

use crate::models::{EndpointAddress, ProtocolVariant, QueryResult};
use crate::utils::error::FallbackError;

/// Default aggregator endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.mcsrvstat.us";

/// Secondary status source consulted after a failed probe
#[async_trait]
pub trait FallbackSource: Send + Sync {
    async fn resolve(
        &self,
        address: &EndpointAddress,
        protocol: ProtocolVariant,
    ) -> Result<QueryResult, FallbackError>;
}

/// HTTP client for the status aggregator
pub struct FallbackResolver {
    /// HTTP client with the lookup deadline baked in
    client: Client,

    /// Aggregator base URL, overridable for mock servers
    base_url: String,
}

impl FallbackResolver {
    /// Create a resolver against the public aggregator
    ///
    /// # Errors
    ///
    /// Returns `FallbackError::Unavailable` if the HTTP client cannot be built
    pub fn new(timeout: Duration) -> Result<Self, FallbackError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    /// Create a resolver against a custom base URL
    ///
    /// # Errors
    ///
    /// Returns `FallbackError::Unavailable` if the HTTP client cannot be built
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, FallbackError> {
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(Self::build_headers())
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        // The aggregator rejects requests without a descriptive user agent.
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("niward/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Build the lookup URL for one edition
    fn lookup_url(&self, address: &EndpointAddress, bedrock: bool) -> String {
        if bedrock {
            format!("{}/bedrock/3/{}", self.base_url, address)
        } else {
            format!("{}/3/{}", self.base_url, address)
        }
    }

    async fn lookup(
        &self,
        address: &EndpointAddress,
        bedrock: bool,
    ) -> Result<QueryResult, FallbackError> {
        let url = self.lookup_url(address, bedrock);
        tracing::debug!(url = %url, "Querying status aggregator");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FallbackError::unavailable(format!(
                "aggregator returned status {status}"
            )));
        }

        let body: AggregatorStatus = response
            .json()
            .await
            .map_err(|e| FallbackError::unavailable(format!("malformed aggregator body: {e}")))?;

        body.into_query_result()
    }
}

#[async_trait]
impl FallbackSource for FallbackResolver {
    async fn resolve(
        &self,
        address: &EndpointAddress,
        protocol: ProtocolVariant,
    ) -> Result<QueryResult, FallbackError> {
        match protocol {
            ProtocolVariant::Java => self.lookup(address, false).await,
            ProtocolVariant::Bedrock => self.lookup(address, true).await,
            ProtocolVariant::Both => match self.lookup(address, false).await {
                Ok(result) => Ok(result),
                Err(e) => {
                    tracing::debug!(endpoint = %address, error = %e, "Java lookup failed, trying Bedrock");
                    self.lookup(address, true).await
                }
            },
        }
    }
}

// ============================================================================
// Aggregator payload
// ============================================================================

#[derive(Debug, Deserialize)]
struct AggregatorStatus {
    #[serde(default)]
    online: bool,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    motd: Option<AggregatorMotd>,
    #[serde(default)]
    players: Option<AggregatorPlayers>,
}

#[derive(Debug, Deserialize)]
struct AggregatorMotd {
    #[serde(default)]
    clean: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AggregatorPlayers {
    #[serde(default)]
    online: u32,
    #[serde(default)]
    max: u32,
    #[serde(default)]
    list: Vec<AggregatorPlayer>,
}

#[derive(Debug, Deserialize)]
struct AggregatorPlayer {
    name: String,
}

impl AggregatorStatus {
    fn into_query_result(self) -> Result<QueryResult, FallbackError> {
        if !self.online {
            return Err(FallbackError::unavailable(
                "aggregator reports server unreachable",
            ));
        }

        let motd = self
            .motd
            .map(|m| {
                m.clean
                    .iter()
                    .map(|line| line.trim())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        let (player_count, max_players, player_sample) = match self.players {
            Some(p) => (
                p.online,
                p.max,
                p.list.into_iter().map(|player| player.name).collect(),
            ),
            None => (0, 0, Vec::new()),
        };

        Ok(QueryResult {
            reachable: true,
            player_count,
            max_players,
            latency_ms: None,
            motd,
            player_sample,
            version: self.version,
        })
    }
}
