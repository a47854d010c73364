use serde::{Deserialize, Serialize};

use crate::core::pairing::Pairing;
use crate::core::types::{ParticipantId, PoolTag};

/// A member of the event roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique identifier
    pub id: ParticipantId,

    /// Role pool; matching never crosses pools
    pub pool: PoolTag,

    /// Whether an administrator has admitted this participant.
    /// Only accepted participants are eligible for matching.
    #[serde(default)]
    pub accepted: bool,

    /// Who gives a gift to this participant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub giver: Option<ParticipantId>,

    /// Who this participant gives a gift to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<ParticipantId>,
}

impl Participant {
    /// A pending participant with no pairing
    pub fn new(id: impl Into<ParticipantId>, pool: impl Into<PoolTag>) -> Self {
        Self {
            id: id.into(),
            pool: pool.into(),
            accepted: false,
            giver: None,
            receiver: None,
        }
    }

    #[must_use]
    pub fn accepted(mut self) -> Self {
        self.accepted = true;
        self
    }

    /// Whether this participant currently holds either cross-reference
    pub fn is_paired(&self) -> bool {
        self.giver.is_some() || self.receiver.is_some()
    }

    /// Drop both cross-references. Returns true if anything was cleared.
    pub fn clear_pairing(&mut self) -> bool {
        let was_paired = self.is_paired();
        self.giver = None;
        self.receiver = None;
        was_paired
    }

    /// The outgoing edge of this participant, if it has a receiver
    pub fn outgoing(&self) -> Option<Pairing> {
        self.receiver
            .as_ref()
            .map(|receiver| Pairing::new(self.id.clone(), receiver.clone()))
    }

    /// Neither reference may point back at the participant itself.
    /// Giver and receiver coincide only in a two-member pool.
    pub fn references_are_valid(&self) -> bool {
        self.giver.as_ref() != Some(&self.id) && self.receiver.as_ref() != Some(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_participant_is_pending_and_unpaired() {
        let p = Participant::new("alice", "elves");
        assert!(!p.accepted);
        assert!(!p.is_paired());
        assert!(p.outgoing().is_none());
    }

    #[test]
    fn test_clear_pairing_reports_change() {
        let mut p = Participant::new("alice", "elves").accepted();
        p.giver = Some(ParticipantId::new("carol"));
        p.receiver = Some(ParticipantId::new("bob"));

        assert_eq!(
            p.outgoing(),
            Some(Pairing::new(ParticipantId::new("alice"), ParticipantId::new("bob")))
        );
        assert!(p.clear_pairing());
        assert!(!p.clear_pairing());
        assert!(!p.is_paired());
    }

    #[test]
    fn test_self_reference_is_invalid() {
        let mut p = Participant::new("alice", "elves");
        assert!(p.references_are_valid());
        p.receiver = Some(ParticipantId::new("alice"));
        assert!(!p.references_are_valid());
    }

    #[test]
    fn test_unpaired_fields_are_omitted_from_json() {
        let p = Participant::new("alice", "elves").accepted();
        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("giver"));
        assert!(!json.contains("receiver"));

        let back: Participant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
