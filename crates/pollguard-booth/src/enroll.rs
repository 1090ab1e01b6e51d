//! Enrollment workflow: one document scan becomes one registered voter.

use crate::engine::{DocumentScan, EngineError, EngineHandle};
use crate::providers::CaptureFrame;
use chrono::Utc;
use pollguard_registry::{RegistryError, VoterRecord, VoterRegistry};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("document processing timed out after {0:?}")]
    Timeout(Duration),
}

/// A successful enrollment. `incomplete_fields` names the fields left at the
/// sentinel so the operator can be warned without failing the enrollment.
#[derive(Debug)]
pub struct EnrollOutcome {
    pub record: VoterRecord,
    pub incomplete_fields: Vec<&'static str>,
}

/// Fail-fast enrollment: OCR + field extraction, embedding extraction,
/// record assembly, registration. No partial record ever reaches the
/// registry; the workflow commits immediately once every step succeeds
/// (operator confirmation is a presentation concern).
pub struct EnrollmentWorkflow {
    engine: EngineHandle,
    registry: Arc<VoterRegistry>,
    timeout: Duration,
}

impl EnrollmentWorkflow {
    pub fn new(engine: EngineHandle, registry: Arc<VoterRegistry>, timeout: Duration) -> Self {
        Self {
            engine,
            registry,
            timeout,
        }
    }

    /// Run the full enrollment sequence over one document scan.
    pub async fn enroll(&self, frame: CaptureFrame) -> Result<EnrollOutcome, EnrollError> {
        let source = frame.source.clone();

        let scan = tokio::time::timeout(self.timeout, self.engine.process_document(frame))
            .await
            .map_err(|_| EnrollError::Timeout(self.timeout))??;
        let DocumentScan { fields, embedding } = scan;

        let incomplete_fields = fields.incomplete_fields();
        if !incomplete_fields.is_empty() {
            tracing::warn!(
                voter = %fields.id,
                missing = ?incomplete_fields,
                "extraction incomplete; sentinel values kept"
            );
        }

        let record = VoterRecord {
            id: fields.id,
            name: fields.name,
            date_of_birth: fields.date_of_birth,
            address: fields.address,
            photo_ref: source,
            template: embedding,
            has_voted: false,
            registered_at: Utc::now(),
        };

        self.registry.register(&record)?;
        tracing::info!(voter = %record.id, name = %record.name, "voter enrolled");

        Ok(EnrollOutcome {
            record,
            incomplete_fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::spawn_engine;
    use crate::testing::{frame, FixedEmbedder, FixedRecognizer};
    use pollguard_core::{BiometricMatcher, Embedding, UNKNOWN};

    const CARD: &str = "ELECTORAL COMMISSION\nName: JANE M DOE\nVOT12345678\nDOB 12/04/1985";

    fn workflow(
        registry: &Arc<VoterRegistry>,
        text: &str,
        embedding: Option<Embedding>,
    ) -> EnrollmentWorkflow {
        let engine = spawn_engine(
            Box::new(FixedRecognizer::new(text)),
            Box::new(FixedEmbedder::new(embedding)),
            BiometricMatcher::default(),
        );
        EnrollmentWorkflow::new(engine, Arc::clone(registry), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn enroll_registers_a_complete_record() {
        let registry = Arc::new(VoterRegistry::in_memory(3).unwrap());
        let wf = workflow(&registry, CARD, Some(Embedding::new(vec![0.1, 0.2, 0.3])));

        let outcome = wf.enroll(frame("scans/jane.png")).await.unwrap();
        assert!(outcome.incomplete_fields.is_empty());
        assert_eq!(outcome.record.id, "VOT12345678");
        assert_eq!(outcome.record.photo_ref, "scans/jane.png");
        assert!(!outcome.record.has_voted);

        let stored = registry.find("VOT12345678").unwrap();
        assert_eq!(stored.name, "JANE M DOE");
        assert_eq!(stored.template.values, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn no_face_aborts_without_writing() {
        let registry = Arc::new(VoterRegistry::in_memory(3).unwrap());
        let wf = workflow(&registry, CARD, None);

        let err = wf.enroll(frame("scans/jane.png")).await.unwrap_err();
        assert!(matches!(err, EnrollError::Engine(EngineError::NoFaceDetected)));
        assert_eq!(registry.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_id_propagates_unchanged() {
        let registry = Arc::new(VoterRegistry::in_memory(3).unwrap());
        let wf = workflow(&registry, CARD, Some(Embedding::new(vec![0.1, 0.2, 0.3])));

        wf.enroll(frame("scans/jane.png")).await.unwrap();
        let err = wf.enroll(frame("scans/jane-again.png")).await.unwrap_err();
        assert!(matches!(
            err,
            EnrollError::Registry(RegistryError::DuplicateId(ref id)) if id == "VOT12345678"
        ));
        assert_eq!(registry.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn wrong_dimension_aborts_without_writing() {
        let registry = Arc::new(VoterRegistry::in_memory(3).unwrap());
        let wf = workflow(&registry, CARD, Some(Embedding::new(vec![0.1, 0.2])));

        let err = wf.enroll(frame("scans/jane.png")).await.unwrap_err();
        assert!(matches!(
            err,
            EnrollError::Registry(RegistryError::DimensionMismatch { .. })
        ));
        assert_eq!(registry.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn unparseable_document_still_enrolls_with_sentinels() {
        let registry = Arc::new(VoterRegistry::in_memory(3).unwrap());
        let wf = workflow(
            &registry,
            "???", // single junk line: nothing to extract, no second-line fallback
            Some(Embedding::new(vec![0.1, 0.2, 0.3])),
        );

        let outcome = wf.enroll(frame("scans/smudged.png")).await.unwrap();
        assert_eq!(outcome.record.id, UNKNOWN);
        assert_eq!(
            outcome.incomplete_fields,
            vec!["id", "name", "date_of_birth", "address"]
        );
        assert_eq!(registry.count().unwrap(), 1);
    }
}
