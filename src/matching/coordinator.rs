use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::core::pairing::Pairing;
use crate::core::types::{DerangementPolicy, ParticipantId, PoolTag};
use crate::matching::engine::{
    partition_by_pool, MatchResult, MatchingConfig, MatchingEngine, PoolError,
};
use crate::matching::verify::{verify_pool_pairing, PairingViolation};
use crate::store::{PairingStore, StoreError};

#[derive(Error, Debug)]
pub enum RoundError {
    #[error("matching failed, no changes made: {0}")]
    Persistence(#[from] StoreError),

    #[error("invalid assignment for pool {pool}: {violation}")]
    InvalidAssignment {
        pool: PoolTag,
        violation: PairingViolation,
    },

    #[error("pool {0} has no eligible participants")]
    EmptyPool(PoolTag),
}

/// Outcome of one pool in a match round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    Matched,
    InsufficientParticipants,
    InvariantViolation,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    pub pool: PoolTag,
    pub status: PoolStatus,
    pub participants: usize,
    pub pairs: Vec<Pairing>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cycle_lengths: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Summary of a committed match round
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub matched_at: DateTime<Utc>,
    pub policy: DerangementPolicy,
    pub pools: Vec<PoolReport>,
}

impl MatchReport {
    pub fn pool(&self, pool: &PoolTag) -> Option<&PoolReport> {
        self.pools.iter().find(|p| &p.pool == pool)
    }

    /// Every pair written in this round
    pub fn pairs(&self) -> impl Iterator<Item = &Pairing> {
        self.pools.iter().flat_map(|p| p.pairs.iter())
    }

    pub fn all_matched(&self) -> bool {
        self.pools.iter().all(|p| p.status == PoolStatus::Matched)
    }
}

/// Runs the engine against the store's eligible participants and commits the
/// result in one transaction.
///
/// The store is injected; the coordinator holds no state of its own, so
/// concurrent rounds serialize on the store's write path.
pub struct MatchCoordinator<'a, S: PairingStore + ?Sized> {
    store: &'a S,
    config: MatchingConfig,
}

impl<'a, S: PairingStore + ?Sized> MatchCoordinator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            config: MatchingConfig::default(),
        }
    }

    pub fn with_config(store: &'a S, config: MatchingConfig) -> Self {
        Self { store, config }
    }

    /// Draw and commit a new round with an engine built from the configuration
    pub fn run_match(&self) -> Result<MatchReport, RoundError> {
        let mut engine = MatchingEngine::with_config(&self.config);
        self.run_match_with(&mut engine)
    }

    /// Draw and commit a new round using the given engine.
    ///
    /// Pools that matched are rewritten with their new pairs. Pools with too
    /// few participants are cleared, so no stale pairing survives. Pools that
    /// failed verification are left untouched.
    pub fn run_match_with<R: Rng>(
        &self,
        engine: &mut MatchingEngine<R>,
    ) -> Result<MatchReport, RoundError> {
        let eligible = self.store.eligible_participants()?;
        tracing::info!(
            "Starting match round for {} eligible participants ({} policy)",
            eligible.len(),
            engine.policy()
        );

        let pools = partition_by_pool(&eligible);
        let result = engine.compute_matches(&eligible);

        let mut scope: Vec<ParticipantId> = Vec::new();
        let mut pairs: Vec<Pairing> = Vec::new();
        for (pool, outcome) in &result.pools {
            match outcome {
                Ok(pool_pairs) => {
                    scope.extend(pools[pool].iter().cloned());
                    pairs.extend(pool_pairs.iter().cloned());
                }
                Err(PoolError::InsufficientParticipants { .. }) => {
                    scope.extend(pools[pool].iter().cloned());
                }
                Err(PoolError::InvariantViolation { .. }) => {}
            }
        }

        if let Err(e) = self.store.replace_pairings(&scope, &pairs) {
            tracing::error!("Match round not committed: {e}");
            return Err(e.into());
        }

        let report = build_report(&result, &pools, engine.policy());
        tracing::info!(
            "Committed {} pairs across {} pools",
            pairs.len(),
            report.pools.len()
        );
        Ok(report)
    }

    /// Clear every pairing (administrative reset)
    pub fn reset(&self) -> Result<usize, RoundError> {
        let cleared = self.store.clear_pairings()?;
        tracing::info!("Cleared pairings of {cleared} participants");
        Ok(cleared)
    }

    /// Manual override: commit a hand-picked pairing for one pool.
    ///
    /// Bypasses the engine but not the invariants: `pairs` must be a
    /// derangement of the pool's eligible participants (several cycles are
    /// allowed). Written with the same atomic replace as a drawn round.
    pub fn assign_pool(&self, pool: &PoolTag, pairs: &[Pairing]) -> Result<(), RoundError> {
        let members: Vec<ParticipantId> = self
            .store
            .eligible_participants()?
            .into_iter()
            .filter(|p| &p.pool == pool)
            .map(|p| p.id)
            .collect();

        if members.is_empty() {
            return Err(RoundError::EmptyPool(pool.clone()));
        }

        let summary =
            verify_pool_pairing(&members, pairs).map_err(|violation| {
                RoundError::InvalidAssignment {
                    pool: pool.clone(),
                    violation,
                }
            })?;

        self.store.replace_pairings(&members, pairs)?;
        tracing::info!(
            "Assigned {} pairs in pool {pool} ({} cycles)",
            pairs.len(),
            summary.cycle_lengths.len()
        );
        Ok(())
    }
}

fn build_report(
    result: &MatchResult,
    pools: &std::collections::BTreeMap<PoolTag, Vec<ParticipantId>>,
    policy: DerangementPolicy,
) -> MatchReport {
    let pools = result
        .pools
        .iter()
        .map(|(pool, outcome)| {
            let participants = pools.get(pool).map_or(0, Vec::len);
            match outcome {
                Ok(pairs) => {
                    let members = &pools[pool];
                    let cycle_lengths = verify_pool_pairing(members, pairs)
                        .map(|summary| summary.cycle_lengths)
                        .unwrap_or_default();
                    PoolReport {
                        pool: pool.clone(),
                        status: PoolStatus::Matched,
                        participants,
                        pairs: pairs.clone(),
                        cycle_lengths,
                        message: None,
                    }
                }
                Err(e) => PoolReport {
                    pool: pool.clone(),
                    status: match e {
                        PoolError::InsufficientParticipants { .. } => {
                            PoolStatus::InsufficientParticipants
                        }
                        PoolError::InvariantViolation { .. } => PoolStatus::InvariantViolation,
                    },
                    participants,
                    pairs: Vec::new(),
                    cycle_lengths: Vec::new(),
                    message: Some(e.to_string()),
                },
            }
        })
        .collect();

    MatchReport {
        matched_at: Utc::now(),
        policy,
        pools,
    }
}
