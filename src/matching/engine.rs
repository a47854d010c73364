use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::core::pairing::Pairing;
use crate::core::participant::Participant;
use crate::core::types::{DerangementPolicy, ParticipantId, PoolTag};
use crate::matching::verify::{verify_pool_pairing, PairingViolation};

/// Minimum pool size that can be paired without a self-match
pub const MIN_POOL_SIZE: usize = 2;

/// Upper bound on permutation draws for [`DerangementPolicy::Uniform`].
/// A random permutation is a derangement with probability close to 1/e, so
/// reaching this bound means the random source is broken.
pub const MAX_DERANGEMENT_DRAWS: usize = 10_000;

/// Pool-scoped matching failure. Never aborts the other pools.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("pool {pool} has {count} eligible participant(s), at least {MIN_POOL_SIZE} are required")]
    InsufficientParticipants { pool: PoolTag, count: usize },

    #[error("pool {pool} produced an invalid pairing: {violation}")]
    InvariantViolation {
        pool: PoolTag,
        violation: PairingViolation,
    },
}

impl PoolError {
    /// Short machine-readable kind, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientParticipants { .. } => "insufficient_participants",
            Self::InvariantViolation { .. } => "invariant_violation",
        }
    }
}

/// Result of one matching run: one entry per non-empty pool
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub pools: BTreeMap<PoolTag, Result<Vec<Pairing>, PoolError>>,
}

impl MatchResult {
    /// Pairs of every pool that matched
    pub fn matched(&self) -> impl Iterator<Item = (&PoolTag, &Vec<Pairing>)> {
        self.pools
            .iter()
            .filter_map(|(pool, outcome)| outcome.as_ref().ok().map(|pairs| (pool, pairs)))
    }

    /// Failures of every pool that did not match
    pub fn failures(&self) -> impl Iterator<Item = &PoolError> {
        self.pools.values().filter_map(|outcome| outcome.as_ref().err())
    }

    pub fn get(&self, pool: &PoolTag) -> Option<&Result<Vec<Pairing>, PoolError>> {
        self.pools.get(pool)
    }
}

/// Configuration for the matching engine
#[derive(Debug, Clone, Default)]
pub struct MatchingConfig {
    /// Shape of the generated derangement
    pub policy: DerangementPolicy,
    /// Fixed seed for a reproducible draw; entropy when absent
    pub seed: Option<u64>,
}

/// Randomized pairing engine.
///
/// Pure apart from the random source: no I/O and no state beyond the RNG.
pub struct MatchingEngine<R: Rng = StdRng> {
    rng: R,
    policy: DerangementPolicy,
}

impl MatchingEngine<StdRng> {
    /// Engine with default configuration seeded from OS entropy
    pub fn new() -> Self {
        Self::with_config(&MatchingConfig::default())
    }

    /// Engine from configuration; uses the configured seed when present
    pub fn with_config(config: &MatchingConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(rng, config.policy)
    }
}

impl Default for MatchingEngine<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> MatchingEngine<R> {
    /// Engine driven by a caller-supplied random source
    pub fn with_rng(rng: R, policy: DerangementPolicy) -> Self {
        Self { rng, policy }
    }

    pub fn policy(&self) -> DerangementPolicy {
        self.policy
    }

    /// Pair every eligible participant within its pool.
    ///
    /// The caller is responsible for filtering to accepted participants.
    /// Pools with no members are absent from the result.
    pub fn compute_matches(&mut self, participants: &[Participant]) -> MatchResult {
        let pools = partition_by_pool(participants);
        let duplicated = duplicated_ids(participants);

        let mut result = MatchResult::default();
        for (pool, members) in pools {
            let outcome = match members.iter().find(|id| duplicated.contains(*id)) {
                Some(id) => Err(PoolError::InvariantViolation {
                    pool: pool.clone(),
                    violation: PairingViolation::DuplicateParticipant(id.clone()),
                }),
                None => self.match_pool(&pool, members),
            };

            match &outcome {
                Ok(pairs) => tracing::debug!("Pool {pool}: drew {} pairs", pairs.len()),
                Err(e) => tracing::warn!("{e}"),
            }
            result.pools.insert(pool, outcome);
        }

        result
    }

    /// Pair a single pool and verify the outcome before returning it
    fn match_pool(
        &mut self,
        pool: &PoolTag,
        members: Vec<ParticipantId>,
    ) -> Result<Vec<Pairing>, PoolError> {
        if members.len() < MIN_POOL_SIZE {
            return Err(PoolError::InsufficientParticipants {
                pool: pool.clone(),
                count: members.len(),
            });
        }

        let pairs = match self.policy {
            DerangementPolicy::SingleCycle => Ok(self.rotate_shuffled(members.clone())),
            DerangementPolicy::Uniform => self.sample_derangement(&members),
        }
        .map_err(|violation| PoolError::InvariantViolation {
            pool: pool.clone(),
            violation,
        })?;

        // Fail closed: an invalid pairing is never handed to the caller
        verify_pool_pairing(&members, &pairs).map_err(|violation| {
            PoolError::InvariantViolation {
                pool: pool.clone(),
                violation,
            }
        })?;

        Ok(pairs)
    }

    /// Shuffle, then let index i give to index (i + 1) mod n.
    /// Yields exactly one cycle through the whole pool.
    fn rotate_shuffled(&mut self, mut members: Vec<ParticipantId>) -> Vec<Pairing> {
        members.shuffle(&mut self.rng);

        let n = members.len();
        (0..n)
            .map(|i| Pairing::new(members[i].clone(), members[(i + 1) % n].clone()))
            .collect()
    }

    /// Draw uniform permutations until one has no fixed point
    fn sample_derangement(
        &mut self,
        members: &[ParticipantId],
    ) -> Result<Vec<Pairing>, PairingViolation> {
        let mut receivers = members.to_vec();
        for _ in 0..MAX_DERANGEMENT_DRAWS {
            receivers.shuffle(&mut self.rng);
            if members.iter().zip(&receivers).all(|(g, r)| g != r) {
                return Ok(members
                    .iter()
                    .zip(&receivers)
                    .map(|(g, r)| Pairing::new(g.clone(), r.clone()))
                    .collect());
            }
        }
        Err(PairingViolation::SamplingExhausted(MAX_DERANGEMENT_DRAWS))
    }
}

/// Group participant ids by pool tag, keeping input order within a pool
pub fn partition_by_pool(participants: &[Participant]) -> BTreeMap<PoolTag, Vec<ParticipantId>> {
    participants
        .iter()
        .fold(BTreeMap::new(), |mut acc, participant| {
            acc.entry(participant.pool.clone())
                .or_insert_with(Vec::new)
                .push(participant.id.clone());
            acc
        })
}

fn duplicated_ids(participants: &[Participant]) -> BTreeSet<ParticipantId> {
    let mut seen = BTreeSet::new();
    participants
        .iter()
        .filter(|p| !seen.insert(&p.id))
        .map(|p| p.id.clone())
        .collect()
}
