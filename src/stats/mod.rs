//! Per-endpoint statistics
//!
//! Each endpoint key owns a [`StatisticsRecord`] created lazily on its first
//! check. Counters only grow; the record disappears only when the endpoint is
//! deregistered. Uptime is tracked as sessions: an `Online` check opens one if
//! none is open, any other state closes it.
//!
//! Callers pass `now` explicitly so the monitor and tests share one clock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::models::{Classification, EndpointKey, ServerState};

/// Maximum transitions kept per endpoint
pub const MAX_TRANSITIONS: usize = 100;

/// A change of state between two consecutive checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub from: ServerState,
    pub to: ServerState,
    pub at: DateTime<Utc>,
}

/// Accumulated counters for one endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRecord {
    pub total_checks: u64,
    pub online_count: u64,
    pub standby_count: u64,
    pub offline_count: u64,
    pub maintenance_count: u64,
    /// Sum of player counts over online checks
    pub total_players: u64,
    pub max_players_seen: u32,
    pub last_online: Option<DateTime<Utc>>,
    pub last_offline: Option<DateTime<Utc>>,
    /// Start of the open uptime session, if any
    pub uptime_start: Option<DateTime<Utc>>,
    /// Longest closed session, in seconds
    pub longest_uptime_secs: i64,
    #[serde(default)]
    pub transitions: VecDeque<TransitionEvent>,
    pub first_seen: DateTime<Utc>,
}

impl StatisticsRecord {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            total_checks: 0,
            online_count: 0,
            standby_count: 0,
            offline_count: 0,
            maintenance_count: 0,
            total_players: 0,
            max_players_seen: 0,
            last_online: None,
            last_offline: None,
            uptime_start: None,
            longest_uptime_secs: 0,
            transitions: VecDeque::new(),
            first_seen: now,
        }
    }

    pub fn count_for(&self, state: ServerState) -> u64 {
        match state {
            ServerState::Online => self.online_count,
            ServerState::Standby => self.standby_count,
            ServerState::Offline => self.offline_count,
            ServerState::Maintenance => self.maintenance_count,
        }
    }

    fn apply(&mut self, result: &Classification, now: DateTime<Utc>) {
        self.total_checks += 1;

        match result.state {
            ServerState::Online => self.online_count += 1,
            ServerState::Standby => self.standby_count += 1,
            ServerState::Offline => self.offline_count += 1,
            ServerState::Maintenance => self.maintenance_count += 1,
        }

        if result.state == ServerState::Online {
            self.total_players += u64::from(result.player_count);
            self.max_players_seen = self.max_players_seen.max(result.player_count);
            self.last_online = Some(now);
            if self.uptime_start.is_none() {
                self.uptime_start = Some(now);
            }
        } else if let Some(start) = self.uptime_start.take() {
            let session = (now - start).num_seconds().max(0);
            self.longest_uptime_secs = self.longest_uptime_secs.max(session);
            self.last_offline = Some(now);
        }
    }

    fn push_transition(&mut self, event: TransitionEvent) {
        self.transitions.push_back(event);
        while self.transitions.len() > MAX_TRANSITIONS {
            self.transitions.pop_front();
        }
    }

    /// Percentage of checks that landed in `state`
    pub fn percentage(&self, state: ServerState) -> f64 {
        if self.total_checks == 0 {
            0.0
        } else {
            self.count_for(state) as f64 / self.total_checks as f64 * 100.0
        }
    }

    /// Average player count over online checks
    pub fn average_players(&self) -> f64 {
        if self.online_count == 0 {
            0.0
        } else {
            self.total_players as f64 / self.online_count as f64
        }
    }

    /// Length of the open session, measured against `now`
    pub fn current_session(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.uptime_start.map(|start| (now - start).max(Duration::zero()))
    }

    /// Longest uptime, counting the open session
    pub fn longest_uptime(&self, now: DateTime<Utc>) -> Duration {
        let closed = Duration::seconds(self.longest_uptime_secs);
        match self.current_session(now) {
            Some(open) => closed.max(open),
            None => closed,
        }
    }
}

/// Read-only view over one record
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub key: EndpointKey,
    pub total_checks: u64,
    pub uptime_percent: f64,
    pub standby_percent: f64,
    pub offline_percent: f64,
    pub maintenance_percent: f64,
    pub average_players: f64,
    pub max_players_seen: u32,
    pub current_session_secs: Option<i64>,
    pub longest_uptime_secs: i64,
    pub last_online: Option<DateTime<Utc>>,
    pub last_offline: Option<DateTime<Utc>>,
    pub recent_transitions: Vec<TransitionEvent>,
}

/// All statistics records, keyed by endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsStore {
    records: BTreeMap<EndpointKey, StatisticsRecord>,
}

impl StatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one classification; call exactly once per endpoint per cycle
    pub fn record(&mut self, key: &EndpointKey, result: &Classification, now: DateTime<Utc>) {
        self.records
            .entry(key.clone())
            .or_insert_with(|| StatisticsRecord::new(now))
            .apply(result, now);
    }

    /// Log a transition if `old` is known and differs from `new`
    ///
    /// Returns whether an event was appended.
    pub fn transition(
        &mut self,
        key: &EndpointKey,
        old: Option<ServerState>,
        new: ServerState,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(old) = old else {
            return false;
        };
        if old == new {
            return false;
        }

        self.records
            .entry(key.clone())
            .or_insert_with(|| StatisticsRecord::new(now))
            .push_transition(TransitionEvent {
                from: old,
                to: new,
                at: now,
            });
        true
    }

    pub fn get(&self, key: &EndpointKey) -> Option<&StatisticsRecord> {
        self.records.get(key)
    }

    /// Drop an endpoint's record on deregistration
    pub fn remove(&mut self, key: &EndpointKey) -> Option<StatisticsRecord> {
        self.records.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &EndpointKey> {
        self.records.keys()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Derived figures for one endpoint
    pub fn summary(&self, key: &EndpointKey, now: DateTime<Utc>) -> Option<StatsSummary> {
        let record = self.records.get(key)?;

        Some(StatsSummary {
            key: key.clone(),
            total_checks: record.total_checks,
            uptime_percent: record.percentage(ServerState::Online),
            standby_percent: record.percentage(ServerState::Standby),
            offline_percent: record.percentage(ServerState::Offline),
            maintenance_percent: record.percentage(ServerState::Maintenance),
            average_players: record.average_players(),
            max_players_seen: record.max_players_seen,
            current_session_secs: record.current_session(now).map(|d| d.num_seconds()),
            longest_uptime_secs: record.longest_uptime(now).num_seconds(),
            last_online: record.last_online,
            last_offline: record.last_offline,
            recent_transitions: record.transitions.iter().rev().take(10).cloned().collect(),
        })
    }
}
