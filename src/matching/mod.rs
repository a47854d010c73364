//! Randomized gift-pairing engine and the round coordinator around it.
//!
//! - [`MatchingEngine`]: pure pairing of eligible participants, pool by pool
//! - [`MatchCoordinator`]: reads eligible participants from a store, runs the
//!   engine and commits the result atomically
//! - [`verify_pool_pairing`]: checks that a pair set is a derangement of a pool
//!
//! ## Pairing Algorithm
//!
//! For every pool with at least two members:
//!
//! 1. **Shuffle**: Fisher-Yates over the pool's members (all orders equally likely)
//! 2. **Rotate**: member `i` gives to member `(i + 1) mod n`
//! 3. **Verify**: every member gives once and receives once, nobody draws themselves
//!
//! The result is always a single cycle through the whole pool. The
//! [`DerangementPolicy::Uniform`] policy instead samples uniformly among all
//! derangements, which may split the pool into smaller cycles.
//!
//! A pool with one member fails with `InsufficientParticipants`; empty pools
//! produce nothing. A failing pool never stops the others.
//!
//! ## Example
//!
//! ```rust
//! use secret_santa::{MatchingEngine, Participant, PoolTag};
//!
//! let participants = vec![
//!     Participant::new("alice", "elves").accepted(),
//!     Participant::new("bob", "elves").accepted(),
//!     Participant::new("carol", "elves").accepted(),
//!     Participant::new("dasher", "reindeer").accepted(),
//! ];
//!
//! let mut engine = MatchingEngine::new();
//! let result = engine.compute_matches(&participants);
//!
//! let elves = result.get(&PoolTag::new("elves")).unwrap().as_ref().unwrap();
//! assert_eq!(elves.len(), 3);
//! assert!(result.get(&PoolTag::new("reindeer")).unwrap().is_err());
//! ```
//!
//! [`DerangementPolicy::Uniform`]: crate::core::types::DerangementPolicy::Uniform

pub mod coordinator;
pub mod engine;
pub mod verify;

pub use coordinator::{MatchCoordinator, MatchReport, RoundError};
pub use engine::{MatchResult, MatchingConfig, MatchingEngine, PoolError};
pub use verify::{verify_pool_pairing, PairingViolation};
