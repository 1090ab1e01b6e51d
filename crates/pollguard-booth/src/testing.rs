//! Test doubles for the capability providers.

use crate::providers::{CaptureError, CaptureFrame, FaceEmbedder, TextRecognizer};
use pollguard_core::Embedding;
use std::collections::VecDeque;
use std::time::Duration;

pub fn frame(source: &str) -> CaptureFrame {
    CaptureFrame::new(Vec::new(), source)
}

/// Returns the same recognized text for every frame.
pub struct FixedRecognizer(String);

impl FixedRecognizer {
    pub fn new(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl TextRecognizer for FixedRecognizer {
    fn recognize_text(&mut self, _frame: &CaptureFrame) -> Result<String, CaptureError> {
        Ok(self.0.clone())
    }
}

/// Returns the same embedding (or no face) for every frame.
pub struct FixedEmbedder(Option<Embedding>);

impl FixedEmbedder {
    pub fn new(embedding: Option<Embedding>) -> Self {
        Self(embedding)
    }
}

impl FaceEmbedder for FixedEmbedder {
    fn detect_face(&mut self, _frame: &CaptureFrame) -> Result<Option<Embedding>, CaptureError> {
        Ok(self.0.clone())
    }
}

/// Pops one scripted result per capture; panics if the script runs dry.
pub struct ScriptedEmbedder(VecDeque<Option<Embedding>>);

impl ScriptedEmbedder {
    pub fn new(script: Vec<Option<Embedding>>) -> Self {
        Self(script.into())
    }
}

impl FaceEmbedder for ScriptedEmbedder {
    fn detect_face(&mut self, _frame: &CaptureFrame) -> Result<Option<Embedding>, CaptureError> {
        Ok(self.0.pop_front().expect("scripted embedder exhausted"))
    }
}

/// Always fails, as a broken device would.
pub struct FailingEmbedder;

impl FaceEmbedder for FailingEmbedder {
    fn detect_face(&mut self, _frame: &CaptureFrame) -> Result<Option<Embedding>, CaptureError> {
        Err(CaptureError::Embedder("device unavailable".to_string()))
    }
}

/// Blocks before answering, to exercise caller-side timeouts.
pub struct SlowEmbedder {
    pub delay: Duration,
    pub embedding: Embedding,
}

impl FaceEmbedder for SlowEmbedder {
    fn detect_face(&mut self, _frame: &CaptureFrame) -> Result<Option<Embedding>, CaptureError> {
        std::thread::sleep(self.delay);
        Ok(Some(self.embedding.clone()))
    }
}
