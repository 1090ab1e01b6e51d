//! Per-voter verification session: search → verify → result.
//!
//! One session admits at most one voter. Denials (`NotFound`,
//! `AlreadyVoted`, `NoFaceDetected`, non-match) are recoverable-by-retry
//! outcomes surfaced to the operator; a dimensionality mismatch or registry
//! corruption aborts the session entirely.

use crate::engine::{EngineError, EngineHandle, ProbeResult};
use crate::providers::{CaptureError, CaptureFrame};
use chrono::{DateTime, Utc};
use pollguard_core::Embedding;
use pollguard_registry::{RegistryError, VoterRecord, VoterRegistry};
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Single-use admission pass issued when a voter is admitted. Serialized to
/// JSON for the QR renderer at the voting machine.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionPass {
    pub voter_id: String,
    pub token: String,
    /// Match confidence percent at admission time.
    pub score: u8,
    pub issued_at: DateTime<Utc>,
}

impl AdmissionPass {
    fn issue(voter_id: &str, score: u8) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(9)
            .map(char::from)
            .collect();
        Self {
            voter_id: voter_id.to_string(),
            token: format!("SECURE-{}", suffix.to_lowercase()),
            score,
            issued_at: Utc::now(),
        }
    }
}

/// One live-capture comparison inside a session. Ephemeral: it exists for
/// the duration of one verify step, feeds the audit log, and is discarded.
#[derive(Debug)]
pub struct VerificationAttempt {
    pub voter_id: String,
    pub live_embedding: Embedding,
    pub distance: f32,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Admitted,
    NoMatch,
    /// The vote-status transition was won by a concurrent session.
    LostRace,
}

/// Operator-facing step the session is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Search,
    Verify,
    Result,
}

/// Internal state; the variants carry what the step has established so the
/// record can never be half-present.
enum Phase {
    Search,
    Verify { record: VoterRecord, attempts: u32 },
    Result { record: VoterRecord, pass: AdmissionPass },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no voter registered under id {0:?}")]
    NotFound(String),
    #[error("voter {0:?} has already voted")]
    AlreadyVoted(String),
    #[error("no face detected in the live capture")]
    NoFaceDetected,
    #[error("face does not match the stored template (distance {distance:.4}, score {score}%)")]
    NoMatch { distance: f32, score: u8 },
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("live capture timed out after {0:?}")]
    Timeout(Duration),
    #[error("expected the {expected:?} step, session is in {actual:?}")]
    InvalidStep { expected: Step, actual: Step },
    #[error("session aborted by an earlier fatal error")]
    Aborted,
    #[error("fatal: {0}")]
    Fatal(String),
}

/// State machine driving one voter through search, live verification and
/// admission. No step is ever skipped; the only backward movement is the
/// retry loop inside the verify step.
pub struct VerificationSession {
    session_id: Uuid,
    engine: EngineHandle,
    registry: Arc<VoterRegistry>,
    capture_timeout: Duration,
    phase: Phase,
    aborted: bool,
}

impl VerificationSession {
    pub fn new(
        engine: EngineHandle,
        registry: Arc<VoterRegistry>,
        capture_timeout: Duration,
    ) -> Self {
        let session_id = Uuid::new_v4();
        tracing::debug!(session = %session_id, "verification session opened");
        Self {
            session_id,
            engine,
            registry,
            capture_timeout,
            phase: Phase::Search,
            aborted: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn step(&self) -> Step {
        match self.phase {
            Phase::Search => Step::Search,
            Phase::Verify { .. } => Step::Verify,
            Phase::Result { .. } => Step::Result,
        }
    }

    /// The candidate record, once the search step has resolved one.
    pub fn candidate(&self) -> Option<&VoterRecord> {
        match &self.phase {
            Phase::Search => None,
            Phase::Verify { record, .. } | Phase::Result { record, .. } => Some(record),
        }
    }

    /// The admission pass, once the voter has been admitted.
    pub fn pass(&self) -> Option<&AdmissionPass> {
        match &self.phase {
            Phase::Result { pass, .. } => Some(pass),
            _ => None,
        }
    }

    /// Search step: resolve a voter id to a candidate record.
    ///
    /// Moves to the verify step only if the record exists and the voter has
    /// not voted; on `NotFound` / `AlreadyVoted` the session stays in search
    /// so the operator can correct the id or turn the voter away.
    pub fn lookup(&mut self, voter_id: &str) -> Result<&VoterRecord, SessionError> {
        self.ensure_step(Step::Search)?;

        let record = match self.registry.find(voter_id) {
            Ok(record) => record,
            Err(RegistryError::NotFound(id)) => {
                tracing::warn!(session = %self.session_id, voter = %id, "voter not found");
                return Err(SessionError::NotFound(id));
            }
            Err(err) => return Err(self.abort(err)),
        };

        if record.has_voted {
            tracing::warn!(session = %self.session_id, voter = %record.id, "voter has already voted");
            return Err(SessionError::AlreadyVoted(record.id));
        }

        tracing::info!(
            session = %self.session_id,
            voter = %record.id,
            name = %record.name,
            "candidate found; awaiting live capture"
        );
        self.phase = Phase::Verify { record, attempts: 0 };
        match &self.phase {
            Phase::Verify { record, .. } => Ok(record),
            _ => unreachable!("phase set above"),
        }
    }

    /// Verify step: one live capture against the candidate's stored template.
    ///
    /// Every deny outcome leaves the session in the verify step for an
    /// unbounded operator-driven retry; only a successful match that also
    /// wins the vote-status transition moves the session to the result step.
    pub async fn capture(&mut self, frame: CaptureFrame) -> Result<AdmissionPass, SessionError> {
        self.ensure_step(Step::Verify)?;

        let (record, attempt_no) = match &mut self.phase {
            Phase::Verify { record, attempts } => {
                *attempts += 1;
                (record.clone(), *attempts)
            }
            _ => unreachable!("step checked above"),
        };

        let probe = self.probe(frame, record.template.clone()).await?;
        let ProbeResult { embedding, outcome } = probe;

        if !outcome.is_match {
            let attempt = VerificationAttempt {
                voter_id: record.id.clone(),
                live_embedding: embedding,
                distance: outcome.distance,
                outcome: AttemptOutcome::NoMatch,
            };
            tracing::warn!(
                session = %self.session_id,
                voter = %attempt.voter_id,
                attempt = attempt_no,
                distance = attempt.distance,
                score = outcome.score,
                "biometric mismatch; staying in verify for retry"
            );
            return Err(SessionError::NoMatch {
                distance: outcome.distance,
                score: outcome.score,
            });
        }

        // Commit the vote transition before admitting. A concurrent session
        // may have won the race; that is a denial, not a crash.
        match self.registry.mark_voted(&record.id) {
            Ok(_) => {}
            Err(RegistryError::AlreadyVoted(id)) => {
                let attempt = VerificationAttempt {
                    voter_id: id.clone(),
                    live_embedding: embedding,
                    distance: outcome.distance,
                    outcome: AttemptOutcome::LostRace,
                };
                tracing::warn!(
                    session = %self.session_id,
                    voter = %attempt.voter_id,
                    attempt = attempt_no,
                    "vote already recorded by a concurrent session; denying"
                );
                return Err(SessionError::AlreadyVoted(id));
            }
            // The record vanished mid-session: only the administrative reset
            // can do that, so treat it as corruption.
            Err(err) => return Err(self.abort(err)),
        }

        let attempt = VerificationAttempt {
            voter_id: record.id.clone(),
            live_embedding: embedding,
            distance: outcome.distance,
            outcome: AttemptOutcome::Admitted,
        };
        let pass = AdmissionPass::issue(&attempt.voter_id, outcome.score);
        tracing::info!(
            session = %self.session_id,
            voter = %attempt.voter_id,
            attempt = attempt_no,
            distance = attempt.distance,
            score = outcome.score,
            token = %pass.token,
            "voter admitted"
        );
        self.phase = Phase::Result {
            record,
            pass: pass.clone(),
        };
        Ok(pass)
    }

    /// Discard this session and hand back a fresh one in the search step.
    /// Also the escape hatch for abandoning a voter mid-verify.
    pub fn next_voter(self) -> VerificationSession {
        tracing::debug!(session = %self.session_id, "session closed; ready for next voter");
        VerificationSession::new(self.engine, self.registry, self.capture_timeout)
    }

    async fn probe(
        &mut self,
        frame: CaptureFrame,
        template: Embedding,
    ) -> Result<ProbeResult, SessionError> {
        let outcome =
            tokio::time::timeout(self.capture_timeout, self.engine.probe_face(frame, template))
                .await;
        match outcome {
            // Dropping the reply abandons the capture in flight; nothing in
            // the registry has been touched yet.
            Err(_) => {
                tracing::warn!(
                    session = %self.session_id,
                    timeout = ?self.capture_timeout,
                    "live capture timed out; staying in verify"
                );
                Err(SessionError::Timeout(self.capture_timeout))
            }
            Ok(Ok(probe)) => Ok(probe),
            Ok(Err(EngineError::NoFaceDetected)) => {
                tracing::warn!(session = %self.session_id, "no face detected in live capture");
                Err(SessionError::NoFaceDetected)
            }
            Ok(Err(EngineError::Capture(err))) => {
                tracing::warn!(session = %self.session_id, error = %err, "capture failed");
                Err(SessionError::Capture(err))
            }
            Ok(Err(err @ EngineError::Match(_))) | Ok(Err(err @ EngineError::ChannelClosed)) => {
                Err(self.abort(err))
            }
        }
    }

    fn ensure_step(&self, expected: Step) -> Result<(), SessionError> {
        if self.aborted {
            return Err(SessionError::Aborted);
        }
        let actual = self.step();
        if actual != expected {
            return Err(SessionError::InvalidStep { expected, actual });
        }
        Ok(())
    }

    /// Fatal condition: record it, poison the session, surface the error.
    fn abort(&mut self, err: impl std::fmt::Display) -> SessionError {
        self.aborted = true;
        tracing::error!(session = %self.session_id, error = %err, "fatal error; session aborted");
        SessionError::Fatal(err.to_string())
    }
}
