use serde::{Deserialize, Serialize};

use crate::core::types::ParticipantId;

/// A directed giver -> receiver edge
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pairing {
    pub giver: ParticipantId,
    pub receiver: ParticipantId,
}

impl Pairing {
    pub fn new(giver: ParticipantId, receiver: ParticipantId) -> Self {
        Self { giver, receiver }
    }

    pub fn is_self_pair(&self) -> bool {
        self.giver == self.receiver
    }

    /// Whether `id` is either end of this edge
    pub fn touches(&self, id: &ParticipantId) -> bool {
        &self.giver == id || &self.receiver == id
    }

    /// Parse the `GIVER:RECEIVER` shorthand used by the CLI
    pub fn parse(s: &str) -> Option<Self> {
        let (giver, receiver) = s.split_once(':')?;
        let (giver, receiver) = (giver.trim(), receiver.trim());
        if giver.is_empty() || receiver.is_empty() {
            return None;
        }
        Some(Self::new(
            ParticipantId::new(giver),
            ParticipantId::new(receiver),
        ))
    }
}

impl std::fmt::Display for Pairing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.giver, self.receiver)
    }
}

/// A participant's current view of its own pairing
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PairingView {
    pub giver: Option<ParticipantId>,
    pub receiver: Option<ParticipantId>,
}
