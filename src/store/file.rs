use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;

use crate::core::pairing::Pairing;
use crate::core::participant::Participant;
use crate::core::types::ParticipantId;
use crate::store::{EventData, EventDocument, PairingStore, StoreError};

/// Event state kept as a JSON document on disk.
///
/// Each write loads the current document, builds the next state, writes it
/// to a temporary file in the same directory and renames it over the
/// original. Writers within the process serialize on a mutex; readers always
/// see a complete document.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open a store at `path`. A missing file is an empty event and is created
    /// on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current state from disk
    pub fn load(&self) -> Result<EventData, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(EventData::new()),
            Err(e) => return Err(e.into()),
        };
        let document: EventDocument = serde_json::from_str(&content)?;
        EventData::from_document(document)
    }

    fn commit(&self, data: &EventData) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&data.to_document())?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path)?;

        tracing::debug!(
            "Committed {} participants to {}",
            data.len(),
            self.path.display()
        );
        Ok(())
    }

    fn transact<T>(
        &self,
        f: impl FnOnce(&EventData) -> Result<(EventData, T), StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let current = self.load()?;
        let (next, value) = f(&current)?;
        self.commit(&next)?;
        Ok(value)
    }
}

impl PairingStore for FileStore {
    fn participants(&self) -> Result<Vec<Participant>, StoreError> {
        Ok(self.load()?.participants())
    }

    fn get(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        Ok(self.load()?.get(id).cloned())
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
