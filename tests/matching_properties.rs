//! Matching Engine Property Tests
//!
//! Checks the pairing guarantees over many random draws: every member of a
//! pool gives once and receives once, nobody draws themselves, undersized
//! pools fail on their own, and the draws are actually random.

use std::collections::{BTreeSet, HashSet};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use secret_santa::matching::verify::{cycles, verify_pool_pairing};
use secret_santa::{
    DerangementPolicy, MatchingEngine, Pairing, Participant, ParticipantId, PoolError, PoolTag,
};

fn roster(pool: &str, names: &[&str]) -> Vec<Participant> {
    names
        .iter()
        .map(|n| Participant::new(*n, pool).accepted())
        .collect()
}

fn ids(participants: &[Participant]) -> Vec<ParticipantId> {
    participants.iter().map(|p| p.id.clone()).collect()
}

fn pool_pairs<'a>(
    result: &'a secret_santa::MatchResult,
    pool: &str,
) -> &'a Vec<Pairing> {
    result
        .get(&PoolTag::new(pool))
        .expect("pool missing from result")
        .as_ref()
        .expect("pool should have matched")
}

/// Every pool size from 2 to 40 yields a valid single cycle
#[test]
fn test_every_pool_size_forms_one_cycle() {
    let mut engine = MatchingEngine::with_rng(
        ChaCha8Rng::seed_from_u64(2024),
        DerangementPolicy::SingleCycle,
    );

    for n in 2..=40 {
        let names: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();
        let participants: Vec<Participant> = names
            .iter()
            .map(|name| Participant::new(name.as_str(), "elves").accepted())
            .collect();

        let result = engine.compute_matches(&participants);
        let pairs = pool_pairs(&result, "elves");

        assert_eq!(pairs.len(), n, "pool of {n} should yield {n} pairs");
        let summary = verify_pool_pairing(&ids(&participants), pairs).unwrap();
        assert_eq!(summary.cycle_lengths, vec![n]);
    }
}

/// Pool of four: 1000 draws, each a single 4-cycle, and the order varies
#[test]
fn test_pool_of_four_over_many_draws() {
    let participants = roster("elves", &["P1", "P2", "P3", "P4"]);
    let members = ids(&participants);
    let mut engine = MatchingEngine::new();

    let mut distinct_cycles: HashSet<Vec<ParticipantId>> = HashSet::new();
    for _ in 0..1000 {
        let result = engine.compute_matches(&participants);
        let pairs = pool_pairs(&result, "elves");

        assert_eq!(pairs.len(), 4);
        let givers: BTreeSet<_> = pairs.iter().map(|p| &p.giver).collect();
        let receivers: BTreeSet<_> = pairs.iter().map(|p| &p.receiver).collect();
        assert_eq!(givers.len(), 4);
        assert_eq!(receivers.len(), 4);
        assert!(pairs.iter().all(|p| p.giver != p.receiver));

        let found = cycles(pairs);
        assert_eq!(found.len(), 1, "expected a single 4-cycle, got {found:?}");
        assert!(verify_pool_pairing(&members, pairs).is_ok());
        distinct_cycles.insert(found[0].clone());
    }

    // (4 - 1)! = 6 distinct directed 4-cycles exist; 1000 draws hit well over one
    assert!(
        distinct_cycles.len() > 1,
        "draws should not always produce the same cycle"
    );
}

/// Over enough draws from a fixed seed, all six 4-cycles appear
#[test]
fn test_pool_of_four_reaches_every_cycle() {
    let participants = roster("elves", &["P1", "P2", "P3", "P4"]);
    let mut engine = MatchingEngine::with_rng(
        ChaCha8Rng::seed_from_u64(7),
        DerangementPolicy::SingleCycle,
    );

    let mut distinct_cycles = HashSet::new();
    for _ in 0..1000 {
        let result = engine.compute_matches(&participants);
        distinct_cycles.insert(cycles(pool_pairs(&result, "elves"))[0].clone());
    }
    assert_eq!(distinct_cycles.len(), 6);
}

/// Pool B = [P5] is insufficient while pool A still matches
#[test]
fn test_single_member_pool_does_not_block_others() {
    let mut participants = roster("elves", &["P1", "P2", "P3", "P4"]);
    participants.extend(roster("reindeer", &["P5"]));
    let mut engine = MatchingEngine::new();

    let result = engine.compute_matches(&participants);

    assert_eq!(pool_pairs(&result, "elves").len(), 4);
    match result.get(&PoolTag::new("reindeer")) {
        Some(Err(PoolError::InsufficientParticipants { pool, count })) => {
            assert_eq!(pool, &PoolTag::new("reindeer"));
            assert_eq!(*count, 1);
        }
        other => panic!("expected InsufficientParticipants, got {other:?}"),
    }
}

/// A pool with nobody in it produces neither pairs nor an error
#[test]
fn test_empty_pool_is_silent() {
    let participants = roster("elves", &["P1", "P2"]);
    let mut engine = MatchingEngine::new();

    let result = engine.compute_matches(&participants);
    assert!(result.get(&PoolTag::new("reindeer")).is_none());
    assert_eq!(result.failures().count(), 0);
    assert_eq!(result.pools.len(), 1);
}

/// Two consecutive draws on four participants usually share few edges
#[test]
fn test_redraw_changes_edges() {
    let participants = roster("elves", &["P1", "P2", "P3", "P4"]);
    let mut engine = MatchingEngine::with_rng(
        ChaCha8Rng::seed_from_u64(31),
        DerangementPolicy::SingleCycle,
    );

    let mut identical_rounds = 0;
    for _ in 0..200 {
        let first: BTreeSet<Pairing> = pool_pairs(&engine.compute_matches(&participants), "elves")
            .iter()
            .cloned()
            .collect();
        let second: BTreeSet<Pairing> = pool_pairs(&engine.compute_matches(&participants), "elves")
            .iter()
            .cloned()
            .collect();
        if first == second {
            identical_rounds += 1;
        }
    }

    // identical with probability 1/6 per trial
    assert!(identical_rounds < 100, "{identical_rounds} of 200 redraws repeated");
}

/// Uniform policy: every draw is a derangement, across many pool sizes
#[test]
fn test_uniform_policy_over_pool_sizes() {
    let mut engine = MatchingEngine::with_rng(
        ChaCha8Rng::seed_from_u64(99),
        DerangementPolicy::Uniform,
    );

    for n in 2..=25 {
        let names: Vec<String> = (0..n).map(|i| format!("m{i}")).collect();
        let participants: Vec<Participant> = names
            .iter()
            .map(|name| Participant::new(name.as_str(), "helpers").accepted())
            .collect();

        for _ in 0..20 {
            let result = engine.compute_matches(&participants);
            let pairs = pool_pairs(&result, "helpers");
            let summary = verify_pool_pairing(&ids(&participants), pairs).unwrap();
            assert_eq!(summary.participants, n);
            assert_eq!(summary.cycle_lengths.iter().sum::<usize>(), n);
        }
    }
}
