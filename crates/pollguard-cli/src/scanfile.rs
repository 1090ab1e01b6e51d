//! Scan-file capture providers.
//!
//! A scan file is the JSON output of an upstream capture station: the text
//! the OCR engine recognized on the document plus the embedding the face
//! model extracted from the same image. `"embedding": null` means the model
//! found no usable face. This is exactly the boundary the booth assumes —
//! text and a numeric vector are handed in; the devices and models that
//! produce them live elsewhere.

use anyhow::{Context, Result};
use pollguard_booth::{CaptureError, CaptureFrame, FaceEmbedder, TextRecognizer};
use pollguard_core::Embedding;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
struct ScanFile {
    #[serde(default)]
    text: String,
    embedding: Option<Vec<f32>>,
}

impl ScanFile {
    fn parse(frame: &CaptureFrame) -> Result<Self, String> {
        serde_json::from_slice(&frame.data)
            .map_err(|e| format!("unreadable scan file {}: {e}", frame.source))
    }
}

/// Read a scan file into a capture frame; the path becomes the frame source
/// (and, at enrollment, the stored photo reference).
pub fn read_frame(path: &Path) -> Result<CaptureFrame> {
    let data = std::fs::read(path)
        .with_context(|| format!("cannot read scan file {}", path.display()))?;
    Ok(CaptureFrame::new(data, path.display().to_string()))
}

/// Both capability providers, backed by the scan file carried in the frame.
pub struct ScanFileProvider;

impl TextRecognizer for ScanFileProvider {
    fn recognize_text(&mut self, frame: &CaptureFrame) -> Result<String, CaptureError> {
        let scan = ScanFile::parse(frame).map_err(CaptureError::Ocr)?;
        Ok(scan.text)
    }
}

impl FaceEmbedder for ScanFileProvider {
    fn detect_face(&mut self, frame: &CaptureFrame) -> Result<Option<Embedding>, CaptureError> {
        let scan = ScanFile::parse(frame).map_err(CaptureError::Embedder)?;
        Ok(scan.embedding.map(Embedding::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(json: &str) -> CaptureFrame {
        CaptureFrame::new(json.as_bytes().to_vec(), "test.json")
    }

    #[test]
    fn parses_text_and_embedding() {
        let f = frame(r#"{"text": "VOT12345678\nJANE", "embedding": [0.1, 0.2]}"#);
        assert_eq!(
            ScanFileProvider.recognize_text(&f).unwrap(),
            "VOT12345678\nJANE"
        );
        assert_eq!(
            ScanFileProvider.detect_face(&f).unwrap(),
            Some(Embedding::new(vec![0.1, 0.2]))
        );
    }

    #[test]
    fn null_embedding_means_no_face() {
        let f = frame(r#"{"text": "x", "embedding": null}"#);
        assert_eq!(ScanFileProvider.detect_face(&f).unwrap(), None);
    }

    #[test]
    fn missing_text_defaults_to_empty() {
        let f = frame(r#"{"embedding": [1.0]}"#);
        assert_eq!(ScanFileProvider.recognize_text(&f).unwrap(), "");
    }

    #[test]
    fn garbage_is_a_capture_error() {
        let f = frame("not json");
        assert!(matches!(
            ScanFileProvider.recognize_text(&f).unwrap_err(),
            CaptureError::Ocr(_)
        ));
        assert!(matches!(
            ScanFileProvider.detect_face(&f).unwrap_err(),
            CaptureError::Embedder(_)
        ));
    }
}
