//! Input validation for roster identifiers.

use crate::core::participant::Participant;
use crate::core::types::{ParticipantId, PoolTag};

/// Maximum number of participants in a single event (DOS protection).
/// Enforced by the store inside its write transaction.
pub const MAX_PARTICIPANTS: usize = 10_000;

/// Maximum length of a participant id or pool tag, in bytes
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Validation error types
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Empty {0} provided")]
    EmptyIdentifier(&'static str),
    #[error("Invalid {0}: exceeds {MAX_IDENTIFIER_LENGTH} bytes")]
    IdentifierTooLong(&'static str),
    #[error("Invalid {0}: contains control characters or surrounding whitespace")]
    InvalidIdentifier(&'static str),
}

/// Validate an identifier used as a participant id or pool tag.
///
/// Identifiers must be non-empty, at most [`MAX_IDENTIFIER_LENGTH`] bytes,
/// without control characters, and without leading or trailing whitespace.
/// The `:` separator of the `GIVER:RECEIVER` shorthand is also rejected.
///
/// # Examples
///
/// ```
/// use secret_santa::utils::validation::validate_identifier;
///
/// assert!(validate_identifier("participant id", "alice").is_ok());
/// assert!(validate_identifier("participant id", " alice").is_err());
/// assert!(validate_identifier("participant id", "a:b").is_err());
/// ```
///
/// # Errors
///
/// Returns `ValidationError::EmptyIdentifier` if the value is blank,
/// `ValidationError::IdentifierTooLong` if it exceeds the limit, or
/// `ValidationError::InvalidIdentifier` if it contains forbidden characters.
pub fn validate_identifier(kind: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyIdentifier(kind));
    }

    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::IdentifierTooLong(kind));
    }

    if value.trim() != value || value.chars().any(|c| c.is_control() || c == ':') {
        return Err(ValidationError::InvalidIdentifier(kind));
    }

    Ok(())
}

/// # Errors
///
/// See [`validate_identifier`].
pub fn validate_participant_id(id: &ParticipantId) -> Result<(), ValidationError> {
    validate_identifier("participant id", id.as_str())
}

/// # Errors
///
/// See [`validate_identifier`].
pub fn validate_pool_tag(pool: &PoolTag) -> Result<(), ValidationError> {
    validate_identifier("pool tag", pool.as_str())
}

/// Validate the identifiers of a participant about to join the roster
///
/// # Errors
///
/// See [`validate_identifier`].
pub fn validate_new_participant(participant: &Participant) -> Result<(), ValidationError> {
    validate_participant_id(&participant.id)?;
    validate_pool_tag(&participant.pool)
}
