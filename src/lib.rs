//! # secret-santa
//!
//! A library for running Secret Santa gift exchanges.
//!
//! Administrators keep a roster of participants, each belonging to a role
//! pool and waiting for acceptance. Once the roster is settled, a match round
//! draws a giver -> receiver pairing inside every pool so that each accepted
//! participant gives exactly one gift and receives exactly one, and nobody
//! draws themselves.
//!
//! ## Features
//!
//! - **Single-cycle draws**: shuffle-and-rotate yields one gift chain per pool
//! - **Uniform derangements**: optional policy sampling among all valid pairings
//! - **Pool isolation**: pools are matched independently; an undersized pool
//!   never blocks the others
//! - **Atomic commits**: a round's clear-then-write is one transaction; a
//!   failed commit leaves the previous pairing in place
//! - **Manual override**: assign a pool's pairing by hand under the same checks
//!
//! ## Example
//!
//! ```rust
//! use secret_santa::{MatchCoordinator, MemoryStore, PairingStore, Participant};
//!
//! let store = MemoryStore::with_participants([
//!     Participant::new("alice", "elves").accepted(),
//!     Participant::new("bob", "elves").accepted(),
//!     Participant::new("carol", "elves").accepted(),
//! ])
//! .unwrap();
//!
//! let report = MatchCoordinator::new(&store).run_match().unwrap();
//! assert!(report.all_matched());
//! assert_eq!(store.pairings().unwrap().len(), 3);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Participants, pairings and identifiers
//! - [`matching`]: Matching engine, verification and round coordination
//! - [`store`]: Persistence trait with in-memory and JSON file stores
//! - [`cli`]: Command-line interface implementation
//! - [`web`]: JSON API server

pub mod cli;
pub mod core;
pub mod matching;
pub mod store;
pub mod utils;
pub mod web;

// Re-export commonly used types for convenience
pub use core::pairing::{Pairing, PairingView};
pub use core::participant::Participant;
pub use core::types::*;
pub use matching::coordinator::{MatchCoordinator, MatchReport, RoundError};
pub use matching::engine::{MatchResult, MatchingConfig, MatchingEngine, PoolError};
pub use store::file::FileStore;
pub use store::memory::MemoryStore;
pub use store::{PairingStore, StoreError};
