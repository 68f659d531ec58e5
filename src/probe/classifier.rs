//! Heuristic state classification
//!
//! Rules are evaluated in strict priority order:
//!
//! 1. maintenance flag set → `Maintenance`, probe data ignored
//! 2. both sources failed → `Offline`
//! 3. MOTD mentions a boot keyword, or host/MOTD mentions Aternos → `Standby`
//! 4. zero players and zero capacity (boot signature) → `Standby`
//! 5. otherwise → `Online`
//!
//! Rule 4 cannot tell a booting server from a running one that advertises
//! zero capacity. It is kept until the servers expose a stronger signal.

use crate::models::{Classification, QueryResult, ResultSource, ServerState};

/// MOTD fragments that mark a server as still booting
pub const STANDBY_KEYWORDS: [&str; 5] = ["starting", "loading", "preparing", "booting", "wait"];

/// Free hosting provider whose parked servers answer pings while asleep
const ATERNOS: &str = "aternos";

/// Result of one probe-then-fallback lookup
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Probe(QueryResult),
    Fallback(QueryResult),
    Failed,
}

/// Map a lookup outcome and the maintenance flag onto a classification
pub fn classify(outcome: ProbeOutcome, host: &str, maintenance: bool) -> Classification {
    if maintenance {
        return Classification::bare(ServerState::Maintenance);
    }

    let (query, source) = match outcome {
        ProbeOutcome::Probe(q) => (q, ResultSource::Probe),
        ProbeOutcome::Fallback(q) => (q, ResultSource::Fallback),
        ProbeOutcome::Failed => return Classification::bare(ServerState::Offline),
    };

    let state = if looks_like_standby(host, &query.motd) || is_boot_signature(&query) {
        ServerState::Standby
    } else {
        ServerState::Online
    };

    Classification::from_query(state, query, source)
}

fn looks_like_standby(host: &str, motd: &str) -> bool {
    let motd = motd.to_lowercase();
    STANDBY_KEYWORDS.iter().any(|k| motd.contains(k))
        || motd.contains(ATERNOS)
        || host.to_lowercase().contains(ATERNOS)
}

fn is_boot_signature(query: &QueryResult) -> bool {
    query.player_count == 0 && query.max_players == 0
}
