//! pollguard-registry — authoritative store of voter records.
//!
//! Enforces the one-person-one-vote invariants: unique voter ids, a fixed
//! biometric template dimensionality, and a `has_voted` flag that flips to
//! true at most once per id, even under concurrent verification sessions.

pub mod record;
pub mod store;

pub use record::VoterRecord;
pub use store::{RegistryError, VoterRegistry};
