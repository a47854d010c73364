//! Persistence Contract Tests
//!
//! Exercises the coordinator against the store contract: re-matching fully
//! supersedes the previous round, resets are idempotent, failed commits leave
//! the prior state in place, and concurrent rounds never interleave.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::thread;

use secret_santa::store::{EventData, PairingStore, StoreError};
use secret_santa::{
    FileStore, MatchCoordinator, MemoryStore, Pairing, PairingView, Participant, ParticipantId,
    RoundError,
};

fn id(s: &str) -> ParticipantId {
    ParticipantId::new(s)
}

fn roster() -> Vec<Participant> {
    vec![
        Participant::new("P1", "elves").accepted(),
        Participant::new("P2", "elves").accepted(),
        Participant::new("P3", "elves").accepted(),
        Participant::new("P4", "elves").accepted(),
        Participant::new("P5", "reindeer").accepted(),
    ]
}

/// Test double that applies `replace_pairings` in two observable phases
/// (clear, then write) and records the state after each phase.
struct RecordingStore {
    inner: MemoryStore,
    snapshots: Mutex<Vec<(&'static str, EventData)>>,
}

impl RecordingStore {
    fn new(participants: Vec<Participant>) -> Self {
        Self {
            inner: MemoryStore::with_participants(participants).unwrap(),
            snapshots: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, phase: &'static str) {
        let snapshot = self.inner.snapshot().unwrap();
        self.snapshots.lock().unwrap().push((phase, snapshot));
    }

    fn take_snapshots(&self) -> Vec<(&'static str, EventData)> {
        std::mem::take(&mut *self.snapshots.lock().unwrap())
    }
}

impl PairingStore for RecordingStore {
    fn participants(&self) -> Result<Vec<Participant>, StoreError> {
        self.inner.participants()
    }

    fn get(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        self.inner.get(id)
    }

    fn add_participant(&self, participant: Participant) -> Result<Participant, StoreError> {
        self.inner.add_participant(participant)
    }

    fn set_accepted(
        &self,
        id: &ParticipantId,
        accepted: bool,
    ) -> Result<Participant, StoreError> {
        self.inner.set_accepted(id, accepted)
    }

    fn remove_participant(&self, id: &ParticipantId) -> Result<Participant, StoreError> {
        self.inner.remove_participant(id)
    }

    fn replace_pairings(
        &self,
        scope: &[ParticipantId],
        pairs: &[Pairing],
    ) -> Result<(), StoreError> {
        self.inner.replace_pairings(scope, &[])?;
        self.record("cleared");
        self.inner.replace_pairings(scope, pairs)?;
        self.record("written");
        Ok(())
    }

    fn clear_pairings(&self) -> Result<usize, StoreError> {
        self.inner.clear_pairings()
    }
}

/// Store whose pairing writes always fail, for rollback checks
struct FailingStore {
    inner: MemoryStore,
}

impl PairingStore for FailingStore {
    fn participants(&self) -> Result<Vec<Participant>, StoreError> {
        self.inner.participants()
    }

    fn get(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        self.inner.get(id)
    }

    fn add_participant(&self, participant: Participant) -> Result<Participant, StoreError> {
        self.inner.add_participant(participant)
    }

    fn set_accepted(
        &self,
        id: &ParticipantId,
        accepted: bool,
    ) -> Result<Participant, StoreError> {
        self.inner.set_accepted(id, accepted)
    }

    fn remove_participant(&self, id: &ParticipantId) -> Result<Participant, StoreError> {
        self.inner.remove_participant(id)
    }

    fn replace_pairings(&self, _: &[ParticipantId], _: &[Pairing]) -> Result<(), StoreError> {
        Err(StoreError::ReadError(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "store timed out",
        )))
    }

    fn clear_pairings(&self) -> Result<usize, StoreError> {
        self.inner.clear_pairings()
    }
}

/// Store that revokes one participant between the round's read and its
/// commit, the way a concurrent admin request would
struct RacingStore {
    inner: MemoryStore,
    revoke: ParticipantId,
}

impl PairingStore for RacingStore {
    fn participants(&self) -> Result<Vec<Participant>, StoreError> {
        self.inner.participants()
    }

    fn get(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        self.inner.get(id)
    }

    fn add_participant(&self, participant: Participant) -> Result<Participant, StoreError> {
        self.inner.add_participant(participant)
    }

    fn set_accepted(
        &self,
        id: &ParticipantId,
        accepted: bool,
    ) -> Result<Participant, StoreError> {
        self.inner.set_accepted(id, accepted)
    }

    fn remove_participant(&self, id: &ParticipantId) -> Result<Participant, StoreError> {
        self.inner.remove_participant(id)
    }

    fn replace_pairings(
        &self,
        scope: &[ParticipantId],
        pairs: &[Pairing],
    ) -> Result<(), StoreError> {
        self.inner.set_accepted(&self.revoke, false)?;
        self.inner.replace_pairings(scope, pairs)
    }

    fn clear_pairings(&self) -> Result<usize, StoreError> {
        self.inner.clear_pairings()
    }
}

/// Check the mirrored-reference rule against one read of the store, so a
/// concurrent commit can never mix two states into the check
fn assert_consistent(store: &dyn PairingStore) {
    let participants: BTreeMap<ParticipantId, Participant> = store
        .participants()
        .unwrap()
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    for p in participants.values() {
        if p.is_paired() {
            assert!(p.accepted, "pending participant {} holds a pairing", p.id);
        }
        if let Some(receiver) = &p.receiver {
            assert_ne!(receiver, &p.id);
            let r = &participants[receiver];
            assert_eq!(r.giver.as_ref(), Some(&p.id));
            assert_eq!(r.pool, p.pool);
        }
        if let Some(giver) = &p.giver {
            assert_ne!(giver, &p.id);
            let g = &participants[giver];
            assert_eq!(g.receiver.as_ref(), Some(&p.id));
        }
    }
}

/// Second round without reset: old references are cleared before new ones
/// are written, and none survive the new round
#[test]
fn test_rematch_clears_before_writing() {
    let store = RecordingStore::new(roster());
    let coordinator = MatchCoordinator::new(&store);

    coordinator.run_match().unwrap();
    let first_round: BTreeSet<Pairing> = store.pairings().unwrap().into_iter().collect();
    assert_eq!(first_round.len(), 4);
    store.take_snapshots();

    let report = coordinator.run_match().unwrap();
    let snapshots = store.take_snapshots();
    assert_eq!(snapshots.len(), 2);

    let (phase, cleared) = &snapshots[0];
    assert_eq!(*phase, "cleared");
    assert!(
        cleared.participants().iter().all(|p| !p.is_paired()),
        "every participant in the round must be unpaired before the write"
    );

    let (phase, written) = &snapshots[1];
    assert_eq!(*phase, "written");
    let written_pairs: BTreeSet<Pairing> = written
        .participants()
        .iter()
        .filter_map(Participant::outgoing)
        .collect();
    let reported: BTreeSet<Pairing> = report.pairs().cloned().collect();
    assert_eq!(written_pairs, reported);

    // The stored state is exactly the new round: no edge carried over
    // unless the new draw picked it again
    let stored: BTreeSet<Pairing> = store.pairings().unwrap().into_iter().collect();
    assert_eq!(stored, reported);
    assert_consistent(&store);
}

/// Re-matching many times never leaves a participant with two givers or
/// two receivers
#[test]
fn test_repeated_rematch_stays_consistent() {
    let store = MemoryStore::with_participants(roster()).unwrap();
    let coordinator = MatchCoordinator::new(&store);

    for _ in 0..100 {
        let report = coordinator.run_match().unwrap();
        let stored: BTreeSet<Pairing> = store.pairings().unwrap().into_iter().collect();
        let reported: BTreeSet<Pairing> = report.pairs().cloned().collect();
        assert_eq!(stored, reported);
        assert_consistent(&store);
    }
}

/// Reset twice in a row leaves everyone unpaired without error
#[test]
fn test_reset_twice() {
    let store = MemoryStore::with_participants(roster()).unwrap();
    let coordinator = MatchCoordinator::new(&store);
    coordinator.run_match().unwrap();

    coordinator.reset().unwrap();
    assert_eq!(coordinator.reset().unwrap(), 0);

    for p in store.participants().unwrap() {
        assert_eq!(
            store.pairing_of(&p.id).unwrap(),
            PairingView::default(),
            "{} should hold no pairing",
            p.id
        );
    }
}

/// A failed commit reports a persistence failure and changes nothing
#[test]
fn test_failed_commit_keeps_prior_state() {
    let inner = MemoryStore::with_participants(roster()).unwrap();
    MatchCoordinator::new(&inner).run_match().unwrap();
    let before = inner.snapshot().unwrap();

    let store = FailingStore { inner };
    let err = MatchCoordinator::new(&store).run_match().unwrap_err();

    assert!(matches!(err, RoundError::Persistence(_)));
    assert!(err.to_string().starts_with("matching failed, no changes made"));
    assert_eq!(store.inner.snapshot().unwrap(), before);
}

/// A revoke that lands between the read and the commit aborts the round
/// instead of pairing a pending participant
#[test]
fn test_revoke_during_round_aborts_commit() {
    let store = RacingStore {
        inner: MemoryStore::with_participants(roster()).unwrap(),
        revoke: id("P3"),
    };

    let err = MatchCoordinator::new(&store).run_match().unwrap_err();
    assert!(matches!(
        err,
        RoundError::Persistence(StoreError::Ineligible(ref p)) if p == &id("P3")
    ));

    let p3 = store.get(&id("P3")).unwrap().unwrap();
    assert!(!p3.accepted);
    assert!(!p3.is_paired());
    assert!(store.pairings().unwrap().is_empty());
    assert_consistent(&store);

    // the retried round sees the new roster and pairs the remaining three
    let report = MatchCoordinator::new(&store.inner).run_match().unwrap();
    assert_eq!(report.pairs().count(), 3);
    assert!(!store.get(&id("P3")).unwrap().unwrap().is_paired());
    assert_consistent(&store);
}

/// A participant whose pool shrinks to one loses the stale pairing
#[test]
fn test_shrunken_pool_is_cleared() {
    let store = MemoryStore::with_participants([
        Participant::new("P1", "elves").accepted(),
        Participant::new("P2", "elves").accepted(),
        Participant::new("P5", "reindeer").accepted(),
        Participant::new("P6", "reindeer").accepted(),
    ])
    .unwrap();
    let coordinator = MatchCoordinator::new(&store);
    coordinator.run_match().unwrap();
    assert!(store.get(&id("P5")).unwrap().unwrap().is_paired());

    // revoking P6 detaches P5's references to it
    store.set_accepted(&id("P6"), false).unwrap();
    let report = coordinator.run_match().unwrap();

    assert!(!report.all_matched());
    assert!(!store.get(&id("P5")).unwrap().unwrap().is_paired());
    assert_eq!(store.pairings().unwrap().len(), 2);
    assert_consistent(&store);
}

/// Concurrent rounds against one store serialize; the final state is one
/// whole round
#[test]
fn test_concurrent_rounds_serialize() {
    let store = Arc::new(MemoryStore::with_participants(roster()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..25 {
                    MatchCoordinator::new(store.as_ref()).run_match().unwrap();
                    assert_consistent(store.as_ref());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.pairings().unwrap().len(), 4);
    assert_consistent(store.as_ref());
}

/// The file store honors the same contract across reopen
#[test]
fn test_file_store_rematch_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("event.json");

    let store = FileStore::open(&path);
    for participant in roster() {
        store.add_participant(participant).unwrap();
    }

    let coordinator = MatchCoordinator::new(&store);
    coordinator.run_match().unwrap();
    let report = coordinator.run_match().unwrap();

    let reopened = FileStore::open(&path);
    let stored: BTreeSet<Pairing> = reopened.pairings().unwrap().into_iter().collect();
    let reported: BTreeSet<Pairing> = report.pairs().cloned().collect();
    assert_eq!(stored, reported);
    assert_consistent(&reopened);

    MatchCoordinator::new(&reopened).reset().unwrap();
    assert!(FileStore::open(&path).pairings().unwrap().is_empty());
}
