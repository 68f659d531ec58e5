//! Endpoint probing with fallback
//!
//! A status lookup goes through up to two sources:
//!
//! ```text
//! ProbeClient (native query, hard deadline)
//!      │ failure
//!      ▼
//! FallbackSource (third-party aggregator over HTTP)
//!      │
//!      ▼
//! classifier::classify  ──►  Classification
//! ```
//!
//! The native query is a blocking collaborator behind [`StatusQuery`]. It runs
//! on tokio's blocking pool so a hung server cannot stall the scheduler; when
//! the deadline passes the wait is abandoned and whatever the worker returns
//! later is dropped with its join handle.

pub mod classifier;
pub mod fallback;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{EndpointAddress, ProtocolVariant, QueryResult};
use crate::utils::error::{FallbackError, ProbeError};

pub use classifier::{classify, ProbeOutcome, STANDBY_KEYWORDS};
pub use fallback::{FallbackResolver, FallbackSource};

/// Native game status query
///
/// Implementations may block; they are always called from a dedicated worker.
pub trait StatusQuery: Send + Sync + 'static {
    fn query(
        &self,
        address: &EndpointAddress,
        protocol: ProtocolVariant,
    ) -> Result<QueryResult, ProbeError>;
}

/// Bounded-timeout wrapper around a [`StatusQuery`]
#[derive(Clone)]
pub struct ProbeClient {
    backend: Option<Arc<dyn StatusQuery>>,
    timeout: Duration,
}

impl ProbeClient {
    pub fn new(backend: Arc<dyn StatusQuery>, timeout: Duration) -> Self {
        Self {
            backend: Some(backend),
            timeout,
        }
    }

    /// Client with native probing disabled; every probe fails fast
    pub fn without_backend(timeout: Duration) -> Self {
        Self {
            backend: None,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue one status query, abandoning it once the deadline passes
    ///
    /// # Errors
    ///
    /// - `ProbeError::Timeout` when the backend does not answer in time
    /// - `ProbeError::Unavailable` when no backend is configured
    /// - `ProbeError::Backend` when the server answers but reports itself unreachable
    pub async fn probe(
        &self,
        address: &EndpointAddress,
        protocol: ProtocolVariant,
    ) -> Result<QueryResult, ProbeError> {
        let Some(backend) = &self.backend else {
            return Err(ProbeError::Unavailable(
                "no native query backend configured".to_string(),
            ));
        };

        let backend = Arc::clone(backend);
        let target = address.clone();
        let worker = tokio::task::spawn_blocking(move || backend.query(&target, protocol));

        match tokio::time::timeout(self.timeout, worker).await {
            // Dropping the handle detaches the worker; its late result is never read.
            Err(_) => Err(ProbeError::Timeout(self.timeout.as_millis() as u64)),
            Ok(Err(join_err)) => Err(ProbeError::Join(join_err.to_string())),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Ok(Ok(result))) if !result.reachable => Err(ProbeError::Backend(
                "server answered but reported itself unreachable".to_string(),
            )),
            Ok(Ok(Ok(result))) => Ok(result),
        }
    }
}

/// Probe, then fall back, and report which source answered
pub async fn resolve_outcome(
    probe: &ProbeClient,
    fallback: &dyn FallbackSource,
    address: &EndpointAddress,
    protocol: ProtocolVariant,
) -> ProbeOutcome {
    match probe.probe(address, protocol).await {
        Ok(result) => return ProbeOutcome::Probe(result),
        Err(e) => tracing::debug!(endpoint = %address, error = %e, "Native probe failed"),
    }

    match fallback.resolve(address, protocol).await {
        Ok(result) => ProbeOutcome::Fallback(result),
        Err(e) => {
            tracing::debug!(endpoint = %address, error = %e, "Fallback lookup failed");
            ProbeOutcome::Failed
        }
    }
}

/// Fallback source that never answers
///
/// Used when the aggregator is disabled in configuration.
pub struct NoFallback;

#[async_trait]
impl FallbackSource for NoFallback {
    async fn resolve(
        &self,
        _address: &EndpointAddress,
        _protocol: ProtocolVariant,
    ) -> Result<QueryResult, FallbackError> {
        Err(FallbackError::unavailable("fallback disabled"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedQuery(QueryResult);

    impl StatusQuery for FixedQuery {
        fn query(
            &self,
            _address: &EndpointAddress,
            _protocol: ProtocolVariant,
        ) -> Result<QueryResult, ProbeError> {
            Ok(self.0.clone())
        }
    }

    struct SlowQuery {
        delay: Duration,
        finished: Arc<AtomicUsize>,
    }

    impl StatusQuery for SlowQuery {
        fn query(
            &self,
            _address: &EndpointAddress,
            _protocol: ProtocolVariant,
        ) -> Result<QueryResult, ProbeError> {
            std::thread::sleep(self.delay);
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(QueryResult {
                reachable: true,
                player_count: 99,
                max_players: 100,
                ..Default::default()
            })
        }
    }

    fn addr() -> EndpointAddress {
        EndpointAddress::new("play.test.com", 25565)
    }

    #[tokio::test]
    async fn test_probe_success() {
        let result = QueryResult {
            reachable: true,
            player_count: 3,
            max_players: 20,
            latency_ms: Some(42),
            ..Default::default()
        };
        let client = ProbeClient::new(Arc::new(FixedQuery(result.clone())), Duration::from_secs(1));

        let answer = client.probe(&addr(), ProtocolVariant::Java).await.unwrap();
        assert_eq!(answer, result);
    }

    #[tokio::test]
    async fn test_probe_unreachable_is_error() {
        let client = ProbeClient::new(
            Arc::new(FixedQuery(QueryResult::default())),
            Duration::from_secs(1),
        );
        let err = client.probe(&addr(), ProtocolVariant::Java).await.unwrap_err();
        assert!(matches!(err, ProbeError::Backend(_)));
    }

    #[tokio::test]
    async fn test_probe_timeout_abandons_call() {
        let finished = Arc::new(AtomicUsize::new(0));
        let client = ProbeClient::new(
            Arc::new(SlowQuery {
                delay: Duration::from_millis(400),
                finished: Arc::clone(&finished),
            }),
            Duration::from_millis(50),
        );

        let started = std::time::Instant::now();
        let err = client.probe(&addr(), ProtocolVariant::Java).await.unwrap_err();

        assert!(matches!(err, ProbeError::Timeout(50)));
        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_without_backend_fails_fast() {
        let client = ProbeClient::without_backend(Duration::from_secs(5));
        let err = client.probe(&addr(), ProtocolVariant::Java).await.unwrap_err();
        assert!(matches!(err, ProbeError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_resolve_outcome_uses_fallback_after_probe_failure() {
        let client = ProbeClient::without_backend(Duration::from_secs(1));
        let outcome = resolve_outcome(&client, &NoFallback, &addr(), ProtocolVariant::Java).await;
        assert!(matches!(outcome, ProbeOutcome::Failed));
    }
}
