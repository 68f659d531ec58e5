//! Reconciliation loop
//!
//! Once per tick every registered endpoint is brought in line with reality,
//! strictly one after another:
//!
//! 1. classify (maintenance override, else cache → probe → fallback)
//! 2. count the check in the statistics store
//! 3. on a change from a known state: alert, then log the transition
//! 4. remember the new state on the registration
//! 5. render the status payload
//! 6. edit the status message in place, or create a replacement when it is gone
//! 7. persist both stores
//!
//! Nothing in a pass is fatal. Probe failures degrade to offline, platform
//! failures are logged per endpoint, and failed saves leave the in-memory
//! state authoritative until the next successful save.
//!
//! [`MonitorState`] is owned here and shared with the command surface via
//! [`Monitor::state`]. The lock is taken per step, never across a probe or a
//! platform call.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, MissedTickBehavior};

use crate::cache::StatusCache;
use crate::error::{Error, Result};
use crate::models::{Classification, EndpointKey, Registration, ServerState};
use crate::notifications::NotificationDispatcher;
use crate::platform::MessagePlatform;
use crate::presentation::{Presenter, StatusPayload};
use crate::probe::{classify, resolve_outcome, FallbackSource, ProbeClient, ProbeOutcome};
use crate::stats::StatsStore;
use crate::storage::{JsonFileStore, Registrations};
use crate::utils::error::PlatformError;
use crate::utils::parse_address;

/// Default pause between endpoints within one tick
pub const DEFAULT_ENDPOINT_DELAY: Duration = Duration::from_secs(1);

/// Default tick period
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Process-wide state threaded through the loop and the command surface
#[derive(Debug, Default)]
pub struct MonitorState {
    pub registrations: Registrations,
    pub stats: StatsStore,
    pub cache: StatusCache,
}

pub type SharedState = Arc<Mutex<MonitorState>>;

/// What happened to an endpoint's status message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageAction {
    /// Existing message updated in place
    Edited,
    /// First message created
    Created(String),
    /// Stored message was gone; a replacement was created
    Replaced(String),
    /// The platform refused or failed; the stored reference is unchanged
    Failed,
}

impl MessageAction {
    /// Reference to persist, if the action produced a new message
    pub fn new_ref(&self) -> Option<&str> {
        match self {
            Self::Created(id) | Self::Replaced(id) => Some(id),
            Self::Edited | Self::Failed => None,
        }
    }
}

/// Result of reconciling one endpoint
#[derive(Debug, Clone)]
pub struct EndpointReport {
    pub owner_id: String,
    pub key: EndpointKey,
    pub state: ServerState,
    /// `(from, to)` when the state changed from a known one
    pub transition: Option<(ServerState, ServerState)>,
    pub message: MessageAction,
}

/// Summary of one pass over all registrations
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub endpoints: Vec<EndpointReport>,
    /// Registrations without a channel reference
    pub skipped: usize,
    pub failed: usize,
}

impl CycleReport {
    pub fn checked(&self) -> usize {
        self.endpoints.len()
    }

    pub fn transitions(&self) -> usize {
        self.endpoints
            .iter()
            .filter(|e| e.transition.is_some())
            .count()
    }
}

/// Drives the periodic reconciliation of every registered endpoint
pub struct Monitor {
    state: SharedState,
    probe: ProbeClient,
    fallback: Arc<dyn FallbackSource>,
    platform: Arc<dyn MessagePlatform>,
    presenter: Arc<dyn Presenter>,
    notifier: NotificationDispatcher,
    registrations_store: JsonFileStore,
    stats_store: JsonFileStore,
    interval: Duration,
    endpoint_delay: Duration,
}

impl Monitor {
    /// Build a monitor and load both stores
    ///
    /// Unreadable or missing store files start empty.
    pub fn new(
        probe: ProbeClient,
        fallback: Arc<dyn FallbackSource>,
        platform: Arc<dyn MessagePlatform>,
        presenter: Arc<dyn Presenter>,
        registrations_store: JsonFileStore,
        stats_store: JsonFileStore,
    ) -> Self {
        let state = MonitorState {
            registrations: registrations_store.load_or_default(),
            stats: stats_store.load_or_default(),
            cache: StatusCache::default(),
        };

        tracing::info!(
            registrations = state.registrations.len(),
            tracked = state.stats.len(),
            "Monitor state loaded"
        );

        let notifier = NotificationDispatcher::new(Arc::clone(&platform), Arc::clone(&presenter));

        Self {
            state: Arc::new(Mutex::new(state)),
            probe,
            fallback,
            platform,
            presenter,
            notifier,
            registrations_store,
            stats_store,
            interval: DEFAULT_INTERVAL,
            endpoint_delay: DEFAULT_ENDPOINT_DELAY,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_endpoint_delay(mut self, delay: Duration) -> Self {
        self.endpoint_delay = delay;
        self
    }

    /// Replace the status cache with one using `ttl`
    ///
    /// Only takes effect before [`state`](Self::state) has been handed out.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        if let Some(state) = Arc::get_mut(&mut self.state) {
            state.get_mut().cache = StatusCache::new(ttl);
        }
        self
    }

    /// Default destination for transition alerts
    pub fn with_alert_channel(mut self, channel: Option<String>) -> Self {
        self.notifier = self.notifier.with_default_channel(channel);
        self
    }

    /// Handle on the shared state for the command surface
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Add or replace the registration for its owner and persist it
    ///
    /// # Errors
    ///
    /// `Error::InvalidAddress` unless the address is `host:port` with a port
    /// in 1..=65535. Nothing is stored in that case.
    pub async fn register(&self, mut registration: Registration) -> Result<()> {
        let raw = registration.address.to_string();
        registration.address =
            parse_address(&raw).ok_or_else(|| Error::InvalidAddress(raw.clone()))?;

        let mut state = self.state.lock().await;
        tracing::info!(
            owner = %registration.owner_id,
            endpoint = %registration.address,
            "Endpoint registered"
        );
        state
            .registrations
            .insert(registration.owner_id.clone(), registration);
        self.save(&state);
        Ok(())
    }

    /// Remove an owner's registration together with its statistics
    pub async fn deregister(&self, owner_id: &str) -> Result<Registration> {
        let mut state = self.state.lock().await;
        let registration = state
            .registrations
            .remove(owner_id)
            .ok_or_else(|| Error::NotRegistered(owner_id.to_string()))?;

        let key = registration.key();
        let still_used = state.registrations.values().any(|r| r.key() == key);
        if !still_used {
            state.stats.remove(&key);
            state.cache.invalidate(&key);
        }

        self.save(&state);
        Ok(registration)
    }

    /// Toggle the maintenance override for an owner's endpoint
    pub async fn set_maintenance(&self, owner_id: &str, enabled: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        let registration = state
            .registrations
            .get_mut(owner_id)
            .ok_or_else(|| Error::NotRegistered(owner_id.to_string()))?;

        registration.maintenance = enabled;
        let key = registration.key();
        state.cache.invalidate(&key);
        self.save(&state);
        Ok(())
    }

    /// Run the timer-driven loop until `shutdown` flips to `true`
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval = ?self.interval, "Reconciliation loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.run_cycle().await;
                    let purged = self.state.lock().await.cache.purge_expired();
                    tracing::info!(
                        checked = report.checked(),
                        skipped = report.skipped,
                        failed = report.failed,
                        transitions = report.transitions(),
                        purged,
                        "Reconciliation pass complete"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Reconciliation loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One sequential pass over every registration
    pub async fn run_cycle(&self) -> CycleReport {
        let owners: Vec<String> = {
            let state = self.state.lock().await;
            state.registrations.keys().cloned().collect()
        };

        let mut report = CycleReport::default();
        let mut first = true;

        for owner in owners {
            if !first && !self.endpoint_delay.is_zero() {
                tokio::time::sleep(self.endpoint_delay).await;
            }

            match self.reconcile_owner(&owner).await {
                Ok(Some(endpoint)) => {
                    first = false;
                    report.endpoints.push(endpoint);
                }
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    // Deregistered between listing and processing
                    tracing::debug!(owner = %owner, error = %e, "Skipping endpoint");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Reconcile a single owner's endpoint now
    ///
    /// Returns `Ok(None)` when the registration has no channel to mirror into,
    /// or when it was removed while the endpoint was being checked.
    ///
    /// # Errors
    ///
    /// `Error::NotRegistered` when the owner has no registration.
    pub async fn reconcile_owner(&self, owner_id: &str) -> Result<Option<EndpointReport>> {
        let registration = {
            let state = self.state.lock().await;
            state
                .registrations
                .get(owner_id)
                .cloned()
                .ok_or_else(|| Error::NotRegistered(owner_id.to_string()))?
        };

        let Some(channel) = registration.channel_ref.clone() else {
            tracing::debug!(owner = %owner_id, "No status channel configured, skipping");
            return Ok(None);
        };

        let key = registration.key();
        let result = self.classify_endpoint(&registration, &key).await;
        let now = Utc::now();

        let previous = registration.last_known_state;
        let transition = previous
            .filter(|prev| *prev != result.state)
            .map(|prev| (prev, result.state));

        {
            let mut state = self.state.lock().await;
            if !state.registrations.contains_key(owner_id) {
                tracing::debug!(owner = %owner_id, "Deregistered during the check, dropping result");
                return Ok(None);
            }
            state.stats.record(&key, &result, now);
        }

        if let Some((from, to)) = transition {
            tracing::info!(endpoint = %key, from = %from, to = %to, "State transition");
            let delivery = self.notifier.send(&registration, from, to).await;
            tracing::debug!(endpoint = %key, delivery = %delivery, "Transition alert handled");
            let mut state = self.state.lock().await;
            if state.registrations.contains_key(owner_id) {
                state.stats.transition(&key, previous, result.state, now);
            }
        }

        let mut current = registration;
        current.last_known_state = Some(result.state);

        let payload = self.presenter.render_status(&current, &result);
        let message = self.reconcile_message(&current, &channel, &payload).await;

        {
            let mut state = self.state.lock().await;
            if let Some(stored) = state.registrations.get_mut(owner_id) {
                stored.last_known_state = Some(result.state);
                if let Some(id) = message.new_ref() {
                    stored.message_ref = Some(id.to_string());
                }
            }
            self.save(&state);
        }

        Ok(Some(EndpointReport {
            owner_id: owner_id.to_string(),
            key,
            state: result.state,
            transition,
            message,
        }))
    }

    async fn classify_endpoint(
        &self,
        registration: &Registration,
        key: &EndpointKey,
    ) -> Classification {
        let host = registration.address.host.as_str();

        if registration.maintenance {
            return classify(ProbeOutcome::Failed, host, true);
        }

        if let Some(hit) = self.state.lock().await.cache.get(key) {
            return hit;
        }

        let outcome = resolve_outcome(
            &self.probe,
            self.fallback.as_ref(),
            &registration.address,
            registration.protocol,
        )
        .await;

        // Only answers are cached; an offline verdict is re-checked next tick.
        let answered = !matches!(outcome, ProbeOutcome::Failed);
        let result = classify(outcome, host, false);
        if answered {
            self.state.lock().await.cache.put(key.clone(), result.clone());
        }

        tracing::debug!(
            endpoint = %key,
            state = %result.state,
            source = ?result.source,
            "Endpoint classified"
        );
        result
    }

    async fn reconcile_message(
        &self,
        registration: &Registration,
        channel: &str,
        payload: &StatusPayload,
    ) -> MessageAction {
        let owner = registration.owner_id.as_str();

        let Some(message_ref) = registration.message_ref.as_deref() else {
            return match self.platform.send_message(channel, payload).await {
                Ok(id) => {
                    tracing::info!(owner = %owner, message = %id, "Status message created");
                    MessageAction::Created(id)
                }
                Err(e) => {
                    tracing::warn!(owner = %owner, error = %e, "Failed to create status message");
                    MessageAction::Failed
                }
            };
        };

        match self
            .platform
            .edit_message(channel, message_ref, payload)
            .await
        {
            Ok(()) => MessageAction::Edited,
            Err(PlatformError::MessageNotFound(_)) => {
                tracing::info!(
                    owner = %owner,
                    message = %message_ref,
                    "Status message gone, creating a replacement"
                );
                match self.platform.send_message(channel, payload).await {
                    Ok(id) => {
                        if let Err(e) = self.platform.pin_message(channel, &id).await {
                            tracing::debug!(owner = %owner, error = %e, "Pin failed, ignoring");
                        }
                        MessageAction::Replaced(id)
                    }
                    Err(e) => {
                        tracing::warn!(
                            owner = %owner,
                            error = %e,
                            "Failed to create replacement status message"
                        );
                        MessageAction::Failed
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    owner = %owner,
                    platform = self.platform.name(),
                    error = %e,
                    "Failed to update status message"
                );
                MessageAction::Failed
            }
        }
    }

    fn save(&self, state: &MonitorState) {
        if let Err(e) = self.registrations_store.save(&state.registrations) {
            tracing::error!(error = %e, "Failed to save registrations");
        }
        if let Err(e) = self.stats_store.save(&state.stats) {
            tracing::error!(error = %e, "Failed to save statistics");
        }
    }
}
