//! Participant and pairing persistence.
//!
//! The matching engine never touches storage. Everything it produces is
//! committed through the [`PairingStore`] trait, which the coordinator and
//! the administrative surfaces receive by explicit injection.
//!
//! ## Atomicity
//!
//! Every mutating operation builds the complete next [`EventData`] from a
//! snapshot of the current one, validates it, and only then swaps it in. A
//! failed validation or commit leaves the previous state untouched, and a
//! concurrent reader sees either the old state or the new one.
//!
//! ## Implementations
//!
//! - [`memory::MemoryStore`]: in-process, behind an `RwLock`
//! - [`file::FileStore`]: a JSON document on disk, committed by atomic rename
//!
//! ## Example
//!
//! ```rust
//! use secret_santa::store::memory::MemoryStore;
//! use secret_santa::store::PairingStore;
//! use secret_santa::core::participant::Participant;
//!
//! let store = MemoryStore::new();
//! store.add_participant(Participant::new("alice", "elves").accepted()).unwrap();
//! assert_eq!(store.eligible_participants().unwrap().len(), 1);
//! ```

pub mod file;
pub mod memory;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::pairing::{Pairing, PairingView};
use crate::core::participant::Participant;
use crate::core::types::ParticipantId;
use crate::utils::validation::MAX_PARTICIPANTS;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read event store: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse event store: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to commit event store: {0}")]
    CommitError(#[from] tempfile::PersistError),

    #[error("Unknown participant: {0}")]
    UnknownParticipant(ParticipantId),

    #[error("Participant already exists: {0}")]
    DuplicateParticipant(ParticipantId),

    #[error("Pairing touches {0}, which is outside the replacement scope")]
    OutOfScope(ParticipantId),

    #[error("{0} is not accepted and cannot be paired")]
    Ineligible(ParticipantId),

    #[error("Pairing {giver} -> {receiver} crosses pools")]
    CrossPool {
        giver: ParticipantId,
        receiver: ParticipantId,
    },

    #[error("Roster is full: the event is limited to {0} participants")]
    RosterFull(usize),

    #[error("Rejected inconsistent pairing write: {0}")]
    InconsistentWrite(String),

    #[error("Event store lock poisoned")]
    Poisoned,
}

/// Store format version for compatibility checking
pub const STORE_VERSION: &str = "1.0.0";

/// Serializable event document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDocument {
    pub version: String,
    pub updated_at: String,
    pub participants: Vec<Participant>,
}

/// Persistence collaborator for the matching workflow.
///
/// Implementations must make [`replace_pairings`](Self::replace_pairings) and
/// [`clear_pairings`](Self::clear_pairings) atomic, and must serialize
/// concurrent writers.
pub trait PairingStore: Send + Sync {
    /// Every participant, ordered by id
    fn participants(&self) -> Result<Vec<Participant>, StoreError>;

    /// Accepted participants only: the input the matching engine expects
    fn eligible_participants(&self) -> Result<Vec<Participant>, StoreError> {
        Ok(self
            .participants()?
            .into_iter()
            .filter(|p| p.accepted)
            .collect())
    }

    fn get(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError>;

    /// Add a new participant. Any pairing fields on the input are ignored,
    /// and the roster is capped at [`MAX_PARTICIPANTS`].
    fn add_participant(&self, participant: Participant) -> Result<Participant, StoreError>;

    /// Flip the acceptance flag. Revoking clears the participant's pairing.
    fn set_accepted(&self, id: &ParticipantId, accepted: bool)
        -> Result<Participant, StoreError>;

    /// Remove a participant and every reference pointing at it
    fn remove_participant(&self, id: &ParticipantId) -> Result<Participant, StoreError>;

    /// Atomically clear every cross-reference of the participants in `scope`
    /// (and references to them held elsewhere), then write `pairs`.
    /// Every scope member must still be accepted, every pair endpoint must
    /// lie inside `scope`, and both ends of a pair must share a pool.
    fn replace_pairings(
        &self,
        scope: &[ParticipantId],
        pairs: &[Pairing],
    ) -> Result<(), StoreError>;

    /// Atomically clear every pairing. Returns how many participants held one.
    fn clear_pairings(&self) -> Result<usize, StoreError>;

    /// Current giver and receiver of a participant
    fn pairing_of(&self, id: &ParticipantId) -> Result<PairingView, StoreError> {
        let participant = self
            .get(id)?
            .ok_or_else(|| StoreError::UnknownParticipant(id.clone()))?;
        Ok(PairingView {
            giver: participant.giver,
            receiver: participant.receiver,
        })
    }

    /// Every current giver -> receiver edge
    fn pairings(&self) -> Result<Vec<Pairing>, StoreError> {
        Ok(self
            .participants()?
            .iter()
            .filter_map(Participant::outgoing)
            .collect())
    }
}

impl<S: PairingStore + ?Sized> PairingStore for std::sync::Arc<S> {
    fn participants(&self) -> Result<Vec<Participant>, StoreError> {
        (**self).participants()
    }

    fn eligible_participants(&self) -> Result<Vec<Participant>, StoreError> {
        (**self).eligible_participants()
    }

    fn get(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        (**self).get(id)
    }

    fn add_participant(&self, participant: Participant) -> Result<Participant, StoreError> {
        (**self).add_participant(participant)
    }

    fn set_accepted(
        &self,
        id: &ParticipantId,
        accepted: bool,
    ) -> Result<Participant, StoreError> {
        (**self).set_accepted(id, accepted)
    }

    fn remove_participant(&self, id: &ParticipantId) -> Result<Participant, StoreError> {
        (**self).remove_participant(id)
    }

    fn replace_pairings(
        &self,
        scope: &[ParticipantId],
        pairs: &[Pairing],
    ) -> Result<(), StoreError> {
        (**self).replace_pairings(scope, pairs)
    }

    fn clear_pairings(&self) -> Result<usize, StoreError> {
        (**self).clear_pairings()
    }

    fn pairing_of(&self, id: &ParticipantId) -> Result<PairingView, StoreError> {
        (**self).pairing_of(id)
    }

    fn pairings(&self) -> Result<Vec<Pairing>, StoreError> {
        (**self).pairings()
    }
}

/// In-memory event state shared by the store implementations.
///
/// Mutations are pure: each returns the next state and leaves `self` as is,
/// so callers can validate fully before swapping anything in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventData {
    participants: BTreeMap<ParticipantId, Participant>,
}

impl EventData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a document. Duplicate ids and references to unknown
    /// participants are rejected.
    pub fn from_document(document: EventDocument) -> Result<Self, StoreError> {
        if document.version != STORE_VERSION {
            tracing::warn!(
                "Event store version mismatch (expected {}, found {})",
                STORE_VERSION,
                document.version
            );
        }

        let mut participants = BTreeMap::new();
        for participant in document.participants {
            let id = participant.id.clone();
            if participants.insert(id.clone(), participant).is_some() {
                return Err(StoreError::DuplicateParticipant(id));
            }
        }

        let data = Self { participants };
        data.check_references()?;
        Ok(data)
    }

    pub fn to_document(&self) -> EventDocument {
        EventDocument {
            version: STORE_VERSION.to_string(),
            updated_at: chrono::Utc::now().to_rfc3339(),
            participants: self.participants.values().cloned().collect(),
        }
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.participants.values().cloned().collect()
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn with_participant(&self, mut participant: Participant) -> Result<Self, StoreError> {
        if self.participants.contains_key(&participant.id) {
            return Err(StoreError::DuplicateParticipant(participant.id));
        }
        if self.participants.len() >= MAX_PARTICIPANTS {
            return Err(StoreError::RosterFull(MAX_PARTICIPANTS));
        }
        participant.clear_pairing();

        let mut next = self.clone();
        next.participants.insert(participant.id.clone(), participant);
        Ok(next)
    }

    pub fn with_acceptance(&self, id: &ParticipantId, accepted: bool) -> Result<Self, StoreError> {
        let mut next = self.clone();
        if !accepted {
            next.detach(id);
        }
        next.participants
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownParticipant(id.clone()))?
            .accepted = accepted;
        Ok(next)
    }

    pub fn without_participant(&self, id: &ParticipantId) -> Result<(Self, Participant), StoreError> {
        let mut next = self.clone();
        next.detach(id);
        let removed = next
            .participants
            .remove(id)
            .ok_or_else(|| StoreError::UnknownParticipant(id.clone()))?;
        Ok((next, removed))
    }

    /// Clear `scope`, then write `pairs`; the core of `replace_pairings`
    pub fn with_replaced_pairings(
        &self,
        scope: &[ParticipantId],
        pairs: &[Pairing],
    ) -> Result<Self, StoreError> {
        let scope_set: BTreeSet<&ParticipantId> = scope.iter().collect();
        // The roster may have changed since the round read it
        for id in &scope_set {
            match self.participants.get(*id) {
                None => return Err(StoreError::UnknownParticipant((*id).clone())),
                Some(p) if !p.accepted && pairs.iter().any(|pair| pair.touches(id)) => {
                    return Err(StoreError::Ineligible((*id).clone()));
                }
                Some(_) => {}
            }
        }

        let mut next = self.clone();
        for id in &scope_set {
            next.detach(id);
        }

        for pair in pairs {
            if pair.is_self_pair() {
                return Err(StoreError::InconsistentWrite(format!(
                    "{} cannot give to themselves",
                    pair.giver
                )));
            }
            for id in [&pair.giver, &pair.receiver] {
                if !scope_set.contains(id) {
                    return Err(StoreError::OutOfScope(id.clone()));
                }
            }
            let giver_pool = next.get(&pair.giver).map(|p| &p.pool);
            if giver_pool != next.get(&pair.receiver).map(|p| &p.pool) {
                return Err(StoreError::CrossPool {
                    giver: pair.giver.clone(),
                    receiver: pair.receiver.clone(),
                });
            }

            let giver = next
                .participants
                .get_mut(&pair.giver)
                .ok_or_else(|| StoreError::UnknownParticipant(pair.giver.clone()))?;
            if giver.receiver.is_some() {
                return Err(StoreError::InconsistentWrite(format!(
                    "{} would hold two receivers",
                    pair.giver
                )));
            }
            giver.receiver = Some(pair.receiver.clone());

            let receiver = next
                .participants
                .get_mut(&pair.receiver)
                .ok_or_else(|| StoreError::UnknownParticipant(pair.receiver.clone()))?;
            if receiver.giver.is_some() {
                return Err(StoreError::InconsistentWrite(format!(
                    "{} would hold two givers",
                    pair.receiver
                )));
            }
            receiver.giver = Some(pair.giver.clone());
        }

        Ok(next)
    }

    /// Every pairing cleared, and how many participants held one
    pub fn with_cleared_pairings(&self) -> (Self, usize) {
        let mut next = self.clone();
        let cleared = next
            .participants
            .values_mut()
            .map(Participant::clear_pairing)
            .filter(|&was_paired| was_paired)
            .count();
        (next, cleared)
    }

    /// Clear a participant's references and the counterpart references
    /// pointing at it. Unknown ids are ignored.
    fn detach(&mut self, id: &ParticipantId) {
        let Some(participant) = self.participants.get_mut(id) else {
            return;
        };
        let giver = participant.giver.take();
        let receiver = participant.receiver.take();

        if let Some(giver_id) = giver {
            if let Some(counterpart) = self.participants.get_mut(&giver_id) {
                if counterpart.receiver.as_ref() == Some(id) {
                    counterpart.receiver = None;
                }
            }
        }
        if let Some(receiver_id) = receiver {
            if let Some(counterpart) = self.participants.get_mut(&receiver_id) {
                if counterpart.giver.as_ref() == Some(id) {
                    counterpart.giver = None;
                }
            }
        }
    }

    /// References must point at known participants, never at the holder,
    /// and must be mirrored on the other side.
    fn check_references(&self) -> Result<(), StoreError> {
        for participant in self.participants.values() {
            if !participant.references_are_valid() {
                return Err(StoreError::InconsistentWrite(format!(
                    "{} references themselves",
                    participant.id
                )));
            }
            if let Some(receiver) = &participant.receiver {
                let mirrored = self
                    .participants
                    .get(receiver)
                    .is_some_and(|r| r.giver.as_ref() == Some(&participant.id));
                if !mirrored {
                    return Err(StoreError::InconsistentWrite(format!(
                        "{} gives to {receiver}, but {receiver} does not list them as giver",
                        participant.id
                    )));
                }
            }
            if let Some(giver) = &participant.giver {
                let mirrored = self
                    .participants
                    .get(giver)
                    .is_some_and(|g| g.receiver.as_ref() == Some(&participant.id));
                if !mirrored {
                    return Err(StoreError::InconsistentWrite(format!(
                        "{} receives from {giver}, but {giver} does not list them as receiver",
                        participant.id
                    )));
                }
            }
        }
        Ok(())
    }
}
