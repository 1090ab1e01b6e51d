//! pollguard-core — ID text field extraction and biometric matching.
//!
//! Pure algorithms only: heuristic parsing of recognized document text into
//! structured identity fields, and Euclidean-distance comparison of face
//! embeddings against a fixed decision threshold. No I/O, no async, no
//! knowledge of where text or embeddings come from.

pub mod extract;
pub mod matcher;

pub use extract::{extract_fields, DocumentFields, ADDRESS_PLACEHOLDER, UNKNOWN};
pub use matcher::{BiometricMatcher, Embedding, MatchError, MatchOutcome, MATCH_THRESHOLD};
