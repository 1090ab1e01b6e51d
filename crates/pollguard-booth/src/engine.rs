//! Capture engine: a dedicated OS thread owning the capability providers.
//!
//! OCR and embedding extraction are slow, blocking, externally-provided
//! calls, so they run on their own thread behind an mpsc request channel
//! with oneshot replies. Dropping a pending reply abandons a capture in
//! flight without corrupting anything — no registry mutation ever happens
//! inside the engine.

use crate::providers::{CaptureError, CaptureFrame, FaceEmbedder, TextRecognizer};
use pollguard_core::{
    extract_fields, BiometricMatcher, DocumentFields, Embedding, MatchError, MatchOutcome,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),
    #[error("no face detected in the captured image")]
    NoFaceDetected,
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Result of processing one enrollment document scan.
#[derive(Debug)]
pub struct DocumentScan {
    pub fields: DocumentFields,
    pub embedding: Embedding,
}

/// Result of probing one live capture against a stored template.
#[derive(Debug)]
pub struct ProbeResult {
    /// The live embedding, for the ephemeral attempt record.
    pub embedding: Embedding,
    pub outcome: MatchOutcome,
}

/// Messages sent from orchestration code to the engine thread.
enum EngineRequest {
    ProcessDocument {
        frame: CaptureFrame,
        reply: oneshot::Sender<Result<DocumentScan, EngineError>>,
    },
    ProbeFace {
        frame: CaptureFrame,
        template: Embedding,
        reply: oneshot::Sender<Result<ProbeResult, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Run OCR + field extraction + embedding extraction over a document
    /// scan, for enrollment.
    pub async fn process_document(&self, frame: CaptureFrame) -> Result<DocumentScan, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::ProcessDocument {
                frame,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Extract one live embedding and compare it against `template`.
    pub async fn probe_face(
        &self,
        frame: CaptureFrame,
        template: Embedding,
    ) -> Result<ProbeResult, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::ProbeFace {
                frame,
                template,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// The thread owns both providers for its whole life and exits when the
/// last [`EngineHandle`] is dropped.
pub fn spawn_engine(
    mut recognizer: Box<dyn TextRecognizer>,
    mut embedder: Box<dyn FaceEmbedder>,
    matcher: BiometricMatcher,
) -> EngineHandle {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("pollguard-engine".into())
        .spawn(move || {
            tracing::info!(threshold = matcher.threshold(), "capture engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::ProcessDocument { frame, reply } => {
                        let result =
                            run_process_document(recognizer.as_mut(), embedder.as_mut(), &frame);
                        let _ = reply.send(result);
                    }
                    EngineRequest::ProbeFace {
                        frame,
                        template,
                        reply,
                    } => {
                        let result = run_probe(embedder.as_mut(), &matcher, &frame, &template);
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("capture engine thread exiting");
        })
        .expect("failed to spawn engine thread");

    EngineHandle { tx }
}

/// OCR the document, extract fields, then extract the enrollment embedding.
fn run_process_document(
    recognizer: &mut dyn TextRecognizer,
    embedder: &mut dyn FaceEmbedder,
    frame: &CaptureFrame,
) -> Result<DocumentScan, EngineError> {
    let text = recognizer.recognize_text(frame)?;
    let fields = extract_fields(&text);
    tracing::debug!(
        source = %frame.source,
        voter = %fields.id,
        "document text recognized and parsed"
    );

    let embedding = embedder
        .detect_face(frame)?
        .ok_or(EngineError::NoFaceDetected)?;

    Ok(DocumentScan { fields, embedding })
}

/// Extract a live embedding and compare it against the stored template.
fn run_probe(
    embedder: &mut dyn FaceEmbedder,
    matcher: &BiometricMatcher,
    frame: &CaptureFrame,
    template: &Embedding,
) -> Result<ProbeResult, EngineError> {
    let embedding = embedder
        .detect_face(frame)?
        .ok_or(EngineError::NoFaceDetected)?;

    let outcome = matcher.compare(&embedding, template)?;
    tracing::debug!(
        source = %frame.source,
        distance = outcome.distance,
        score = outcome.score,
        matched = outcome.is_match,
        "live probe compared"
    );

    Ok(ProbeResult { embedding, outcome })
}
