//! Capability-provider seams for the external OCR engine and face model.
//!
//! Both are consumed as opaque, potentially slow, blocking functions: they
//! either complete with a result or fail explicitly. Device integration and
//! image decoding happen upstream of these traits.

use pollguard_core::Embedding;
use thiserror::Error;

/// One captured image handed to the providers. The payload is opaque to the
/// booth; `source` identifies where it came from (device name, file path)
/// and doubles as the photo reference stored at enrollment.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub data: Vec<u8>,
    pub source: String,
}

impl CaptureFrame {
    pub fn new(data: Vec<u8>, source: impl Into<String>) -> Self {
        Self {
            data,
            source: source.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("text recognition failed: {0}")]
    Ocr(String),
    #[error("face embedding extraction failed: {0}")]
    Embedder(String),
}

/// Optical character recognition over a captured document image.
pub trait TextRecognizer: Send {
    fn recognize_text(&mut self, frame: &CaptureFrame) -> Result<String, CaptureError>;
}

/// Face detection plus descriptor extraction.
///
/// `Ok(None)` means no detectable face — a hard failure for every caller,
/// never silently coerced into a non-match.
pub trait FaceEmbedder: Send {
    fn detect_face(&mut self, frame: &CaptureFrame) -> Result<Option<Embedding>, CaptureError>;
}
