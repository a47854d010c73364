use serde::{Deserialize, Serialize};

/// Unique identifier for a participant in the event roster
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Role pool a participant belongs to. Pools are matched independently and
/// never cross-match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolTag(pub String);

impl PoolTag {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PoolTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PoolTag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PoolTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// How the engine builds a derangement for a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DerangementPolicy {
    /// Shuffle, then pair each member with the next one: always one cycle
    /// through the whole pool
    #[default]
    SingleCycle,
    /// Rejection-sample uniform permutations until none has a fixed point.
    /// May produce several smaller cycles (including 2-cycles).
    Uniform,
}

impl std::fmt::Display for DerangementPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleCycle => write!(f, "single-cycle"),
            Self::Uniform => write!(f, "uniform"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = ParticipantId::new("alice");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"alice\"");

        let pool: PoolTag = serde_json::from_str("\"elves\"").unwrap();
        assert_eq!(pool, PoolTag::new("elves"));
    }

    #[test]
    fn test_policy_display_matches_cli_names() {
        assert_eq!(DerangementPolicy::SingleCycle.to_string(), "single-cycle");
        assert_eq!(DerangementPolicy::Uniform.to_string(), "uniform");
        assert_eq!(DerangementPolicy::default(), DerangementPolicy::SingleCycle);
    }
}
