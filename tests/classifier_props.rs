//! Property tests for state classification

use niward::models::{QueryResult, ServerState};
use niward::probe::{classify, ProbeOutcome};
use proptest::prelude::*;

fn query_strategy() -> impl Strategy<Value = QueryResult> {
    (
        any::<u32>(),
        any::<u32>(),
        proptest::option::of(0u64..10_000),
        ".{0,40}",
        proptest::collection::vec("[A-Za-z0-9_]{3,16}", 0..5),
    )
        .prop_map(|(players, max, latency, motd, sample)| QueryResult {
            reachable: true,
            player_count: players,
            max_players: max,
            latency_ms: latency,
            motd,
            player_sample: sample,
            version: None,
        })
}

fn outcome_strategy() -> impl Strategy<Value = ProbeOutcome> {
    prop_oneof![
        query_strategy().prop_map(ProbeOutcome::Probe),
        query_strategy().prop_map(ProbeOutcome::Fallback),
        Just(ProbeOutcome::Failed),
    ]
}

proptest! {
    #[test]
    fn maintenance_always_wins(outcome in outcome_strategy(), host in "[a-z0-9.-]{1,30}") {
        let result = classify(outcome, &host, true);
        prop_assert_eq!(result.state, ServerState::Maintenance);
    }

    #[test]
    fn failed_lookup_is_offline(host in "[a-z0-9.-]{1,30}") {
        let result = classify(ProbeOutcome::Failed, &host, false);
        prop_assert_eq!(result.state, ServerState::Offline);
        prop_assert_eq!(result.player_count, 0);
    }

    #[test]
    fn plain_populated_server_is_online(
        players in 1u32..1000,
        max in 1u32..1000,
        motd in "[0-9 ]{0,20}",
        host in "[0-9]{1,3}\\.test",
    ) {
        let query = QueryResult {
            reachable: true,
            player_count: players,
            max_players: max,
            motd,
            ..Default::default()
        };
        let result = classify(ProbeOutcome::Probe(query), &host, false);
        prop_assert_eq!(result.state, ServerState::Online);
        prop_assert_eq!(result.player_count, players);
    }

    #[test]
    fn boot_keyword_means_standby(
        keyword in prop::sample::select(vec!["starting", "LOADING", "Preparing", "booting", "please wait"]),
        prefix in "[0-9 ]{0,10}",
        players in 0u32..100,
        max in 1u32..100,
    ) {
        let query = QueryResult {
            reachable: true,
            player_count: players,
            max_players: max,
            motd: format!("{prefix}{keyword}"),
            ..Default::default()
        };
        let result = classify(ProbeOutcome::Fallback(query), "mc.test", false);
        prop_assert_eq!(result.state, ServerState::Standby);
    }
}

#[test]
fn test_documented_examples() {
    let starting = QueryResult {
        reachable: true,
        player_count: 2,
        max_players: 20,
        motd: "Server is starting, please wait".to_string(),
        ..Default::default()
    };
    assert_eq!(
        classify(ProbeOutcome::Probe(starting), "mc.test", false).state,
        ServerState::Standby
    );

    let empty = QueryResult {
        reachable: true,
        motd: "A Minecraft Server".to_string(),
        ..Default::default()
    };
    assert_eq!(
        classify(ProbeOutcome::Probe(empty), "mc.test", false).state,
        ServerState::Standby
    );

    let populated = QueryResult {
        reachable: true,
        player_count: 3,
        max_players: 20,
        ..Default::default()
    };
    let result = classify(ProbeOutcome::Probe(populated), "mc.test", false);
    assert_eq!(result.state, ServerState::Online);
    assert_eq!(result.player_count, 3);
}
