use chrono::{DateTime, Utc};
use pollguard_core::Embedding;
use serde::{Deserialize, Serialize};

/// A registered voter.
///
/// Assembled only by the enrollment workflow, owned by the registry after
/// insertion. Immutable except for the single `has_voted` flip; removed only
/// by the administrative reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterRecord {
    /// Primary key, derived from the scanned document text.
    pub id: String,
    /// Extracted free-text fields; hold the `"UNKNOWN"` sentinel when
    /// extraction failed, never null.
    pub name: String,
    pub date_of_birth: String,
    pub address: String,
    /// Opaque reference to the enrollment image (path, URL or data URI);
    /// the surface the template was derived from.
    pub photo_ref: String,
    /// Biometric template captured at enrollment. Immutable.
    pub template: Embedding,
    pub has_voted: bool,
    pub registered_at: DateTime<Utc>,
}
