use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

use crate::core::pairing::Pairing;
use crate::core::types::ParticipantId;

/// Ways a pair set can fail to be a derangement of its pool
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "participant", rename_all = "snake_case")]
pub enum PairingViolation {
    #[error("{0} is paired with themselves")]
    SelfPair(ParticipantId),

    #[error("{0} appears more than once as a giver")]
    DuplicateGiver(ParticipantId),

    #[error("{0} appears more than once as a receiver")]
    DuplicateReceiver(ParticipantId),

    #[error("{0} is listed more than once in the pool")]
    DuplicateParticipant(ParticipantId),

    #[error("{0} is not a member of the pool")]
    UnknownParticipant(ParticipantId),

    #[error("{0} is missing a giver or a receiver")]
    Uncovered(ParticipantId),

    #[error("no derangement found after {0} draws")]
    SamplingExhausted(usize),
}

/// Shape of a verified pairing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    /// Number of participants covered
    pub participants: usize,
    /// Lengths of the disjoint cycles, longest first
    pub cycle_lengths: Vec<usize>,
}

impl CycleSummary {
    pub fn is_single_cycle(&self) -> bool {
        self.cycle_lengths.len() == 1
    }
}

/// Verify that `pairs` is a permutation of `members` with no fixed points.
///
/// Checks, in order: self pairs, membership, duplicate givers and receivers,
/// and full coverage. Returns the cycle decomposition on success.
///
/// # Errors
///
/// Returns the first [`PairingViolation`] found.
pub fn verify_pool_pairing(
    members: &[ParticipantId],
    pairs: &[Pairing],
) -> Result<CycleSummary, PairingViolation> {
    let mut member_set = BTreeSet::new();
    for member in members {
        if !member_set.insert(member) {
            return Err(PairingViolation::DuplicateParticipant(member.clone()));
        }
    }

    let mut givers = BTreeSet::new();
    let mut receivers = BTreeSet::new();
    for pair in pairs {
        if pair.is_self_pair() {
            return Err(PairingViolation::SelfPair(pair.giver.clone()));
        }
        for id in [&pair.giver, &pair.receiver] {
            if !member_set.contains(id) {
                return Err(PairingViolation::UnknownParticipant(id.clone()));
            }
        }
        if !givers.insert(&pair.giver) {
            return Err(PairingViolation::DuplicateGiver(pair.giver.clone()));
        }
        if !receivers.insert(&pair.receiver) {
            return Err(PairingViolation::DuplicateReceiver(pair.receiver.clone()));
        }
    }

    if let Some(missing) = member_set
        .iter()
        .find(|id| !givers.contains(*id) || !receivers.contains(*id))
    {
        return Err(PairingViolation::Uncovered((*missing).clone()));
    }

    let mut cycle_lengths: Vec<usize> = cycles(pairs).iter().map(Vec::len).collect();
    cycle_lengths.sort_unstable_by(|a, b| b.cmp(a));

    Ok(CycleSummary {
        participants: member_set.len(),
        cycle_lengths,
    })
}

/// Decompose a set of edges into chains following giver -> receiver.
///
/// For a verified permutation every chain is a closed cycle, starting at its
/// smallest participant id so the output is stable for a given edge set. An
/// open chain (left behind when a participant is revoked or removed) starts
/// at its head, the giver nobody gives to, and ends at the last receiver.
pub fn cycles(pairs: &[Pairing]) -> Vec<Vec<ParticipantId>> {
    let next: BTreeMap<&ParticipantId, &ParticipantId> =
        pairs.iter().map(|p| (&p.giver, &p.receiver)).collect();
    let receivers: BTreeSet<&ParticipantId> = next.values().copied().collect();

    // heads of open chains first, then whatever is left lies on a cycle
    let heads = next.keys().filter(|id| !receivers.contains(*id));
    let starts: Vec<&ParticipantId> = heads.chain(next.keys()).copied().collect();

    let mut visited = BTreeSet::new();
    let mut result = Vec::new();

    for start in starts {
        if visited.contains(start) {
            continue;
        }
        let mut chain = Vec::new();
        let mut current = start;
        loop {
            visited.insert(current);
            chain.push(current.clone());
            match next.get(current) {
                Some(&receiver) if !visited.contains(receiver) => current = receiver,
                _ => break,
            }
        }
        result.push(chain);
    }

    result
}

/// Whether a chain from [`cycles`] closes back on its first member
pub fn is_closed(chain: &[ParticipantId], pairs: &[Pairing]) -> bool {
    match (chain.first(), chain.last()) {
        (Some(first), Some(last)) => pairs
            .iter()
            .any(|pair| &pair.giver == last && &pair.receiver == first),
        _ => false,
    }
}
