//! Core data types for Secret Santa events.
//!
//! - [`Participant`]: a roster member with pool, acceptance flag and pairing references
//! - [`Pairing`]: a directed giver -> receiver edge
//! - [`ParticipantId`], [`PoolTag`]: identifiers
//! - [`DerangementPolicy`]: how the engine shapes a pool's permutation
//!
//! ## Pools
//!
//! Every participant carries a pool tag (its role). Pools are disjoint and
//! matched independently of each other:
//!
//! | Pool     | Members          | Possible pairing          |
//! |----------|------------------|---------------------------|
//! | elves    | alice, bob, carol| alice -> carol -> bob -> alice |
//! | reindeer | dasher           | none (insufficient)       |
//!
//! [`Participant`]: participant::Participant
//! [`Pairing`]: pairing::Pairing
//! [`ParticipantId`]: types::ParticipantId
//! [`PoolTag`]: types::PoolTag
//! [`DerangementPolicy`]: types::DerangementPolicy

pub mod pairing;
pub mod participant;
pub mod types;
