use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::pairing::Pairing;
use crate::core::participant::Participant;
use crate::core::types::ParticipantId;
use crate::store::{EventData, PairingStore, StoreError};

/// In-process store. Writers serialize on the lock; readers see whole states.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<EventData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: EventData) -> Self {
        Self {
            state: RwLock::new(data),
        }
    }

    /// Convenience constructor from a list of participants
    pub fn with_participants(
        participants: impl IntoIterator<Item = Participant>,
    ) -> Result<Self, StoreError> {
        let mut data = EventData::new();
        for participant in participants {
            data = data.with_participant(participant)?;
        }
        Ok(Self::from_data(data))
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> Result<EventData, StoreError> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, EventData>, StoreError> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, EventData>, StoreError> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }

    /// Compute the next state under the write lock and swap it in on success
    fn transact<T>(
        &self,
        f: impl FnOnce(&EventData) -> Result<(EventData, T), StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.write()?;
        let (next, value) = f(&*guard)?;
        *guard = next;
        Ok(value)
    }
}

impl PairingStore for MemoryStore {
    fn participants(&self) -> Result<Vec<Participant>, StoreError> {
        Ok(self.read()?.participants())
    }

    fn get(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        Ok(self.read()?.get(id).cloned())
    }

    fn add_participant(&self, participant: Participant) -> Result<Participant, StoreError> {
        let id = participant.id.clone();
        self.transact(|data| {
            let next = data.with_participant(participant)?;
            let added = next.get(&id).cloned();
            Ok((next, added))
        })?
        .ok_or(StoreError::UnknownParticipant(id))
    }

    fn set_accepted(
        &self,
        id: &ParticipantId,
        accepted: bool,
    ) -> Result<Participant, StoreError> {
        self.transact(|data| {
            let next = data.with_acceptance(id, accepted)?;
            let updated = next.get(id).cloned();
            Ok((next, updated))
        })?
        .ok_or_else(|| StoreError::UnknownParticipant(id.clone()))
    }

    fn remove_participant(&self, id: &ParticipantId) -> Result<Participant, StoreError> {
        self.transact(|data| data.without_participant(id))
    }

    fn replace_pairings(
        &self,
        scope: &[ParticipantId],
        pairs: &[Pairing],
    ) -> Result<(), StoreError> {
        self.transact(|data| Ok((data.with_replaced_pairings(scope, pairs)?, ())))
    }

    fn clear_pairings(&self) -> Result<usize, StoreError> {
        self.transact(|data| Ok(data.with_cleared_pairings()))
    }
}
