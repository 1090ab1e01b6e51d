//! pollguard-booth — enrollment and verification orchestration.
//!
//! Owns the capture engine (a dedicated thread driving the external OCR and
//! face-embedding providers), the fail-fast enrollment workflow, and the
//! per-voter verification session state machine that turns a search plus a
//! live capture into an admit/deny decision with an at-most-once voting
//! guarantee.

pub mod config;
pub mod engine;
pub mod enroll;
pub mod providers;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use engine::{spawn_engine, DocumentScan, EngineError, EngineHandle, ProbeResult};
pub use enroll::{EnrollError, EnrollOutcome, EnrollmentWorkflow};
pub use providers::{CaptureError, CaptureFrame, FaceEmbedder, TextRecognizer};
pub use session::{
    AdmissionPass, AttemptOutcome, SessionError, Step, VerificationAttempt, VerificationSession,
};
