//! Intake command handlers.
//!
//! [`IntakeService`] is the surface a presentation layer calls. Each handler runs the
//! encode/store/select logic synchronously and awaits collaborator calls; collaborator
//! failures are converted to inert fallbacks plus one throttled notification so entered data
//! is never lost. Only storage failures and a missing sidecar are returned as errors.

use crate::collaborators::{
    with_timeout, CollaboratorError, CollaboratorResult, DocumentRenderer, ReportEnhancer,
    TextExtractor,
};
use crate::config::IntakeConfig;
use crate::constants::{
    notify_keys, ENHANCE_FAILED_TEXT, ENHANCE_TIMEOUT_TEXT, ENHANCE_UNEXPECTED_TEXT,
};
use crate::notifier::ErrorNotifier;
use crate::record::{truncate_for_preview, IntakeCapture, LabSlot, PatientIntakeRecord};
use crate::render::{render_intake_summary, render_report_document, PdfSummaryRenderer};
use crate::selector::{RecordSelector, Selection, SelectorPrompt};
use crate::store::{PickerFilter, RecordStore, SavedRecord};
use crate::{IntakeError, IntakeResult};
use chrono::Local;
use intake_files::{
    lab_image_extension, ArtifactKind, ArtifactService, PatientStem, DOCUMENT_EXTENSION,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of [`IntakeService::save_intake`].
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub record: PatientIntakeRecord,
    pub saved: SavedRecord,
    /// Present when an enhancer is configured.
    pub report: Option<ReportOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    /// Enhanced text, or the fallback text when enhancement failed.
    pub text: String,
    /// Where the report document was written; `None` if writing it failed.
    pub document_path: Option<PathBuf>,
}

/// Result of [`IntakeService::attach_lab_result`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabAttachment {
    pub slot: LabSlot,
    /// Full extracted text, as stored in the capture.
    pub text: String,
    /// Text truncated for display.
    pub preview: String,
    /// Where the image copy landed; `None` if copying failed.
    pub copied_to: Option<PathBuf>,
}

/// A stored record loaded back for editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedIntake {
    pub document: PathBuf,
    pub record: PatientIntakeRecord,
    pub capture: IntakeCapture,
}

pub struct IntakeService {
    cfg: Arc<IntakeConfig>,
    store: RecordStore,
    notifier: Arc<ErrorNotifier>,
    renderer: Arc<dyn DocumentRenderer>,
    enhancer: Option<Arc<dyn ReportEnhancer>>,
    extractor: Option<Arc<dyn TextExtractor>>,
}

impl IntakeService {
    /// Creates a service rendering with the built-in [`PdfSummaryRenderer`] and no remote
    /// collaborators.
    pub fn new(cfg: Arc<IntakeConfig>, notifier: Arc<ErrorNotifier>) -> Self {
        Self {
            store: RecordStore::new(&cfg),
            cfg,
            notifier,
            renderer: Arc::new(PdfSummaryRenderer),
            enhancer: None,
            extractor: None,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_enhancer(mut self, enhancer: Arc<dyn ReportEnhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }


    /// Encodes `capture` and saves it as a new document/sidecar pair.
    ///
    /// With an enhancer configured, an enhanced report is also written to the AI report
    /// folder under the same stem. Enhancement and rendering failures are notified and
    /// replaced by fallbacks.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError` if the intake pair cannot be written.
    pub async fn save_intake(&self, capture: &IntakeCapture) -> IntakeResult<SaveOutcome> {
        let record = capture.encode();
        let at = Local::now();
        let stem = PatientStem::new(
            &record.demographics.full_name,
            &record.demographics.date_of_birth,
            at,
        );

        let report = match &self.enhancer {
            Some(enhancer) => Some(self.write_report(enhancer.as_ref(), &record, &stem).await),
            None => None,
        };

        let document = match self.render(&record, None).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.notifier.notify(notify_keys::RENDER_INTAKE, &e);
                render_intake_summary(&record, at)
            }
        };

        let saved = self.store.save_record_at(&record, &document, at)?;

        Ok(SaveOutcome {
            record,
            saved,
            report,
        })
    }

    async fn write_report(
        &self,
        enhancer: &dyn ReportEnhancer,
        record: &PatientIntakeRecord,
        stem: &PatientStem,
    ) -> ReportOutcome {
        let text = match with_timeout(self.cfg.remote_timeout(), enhancer.enhance(record)).await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "report enhancement failed");
                self.notifier.notify(notify_keys::ENHANCE_REPORT, &e);
                match e {
                    CollaboratorError::Timeout(_) => ENHANCE_TIMEOUT_TEXT.to_string(),
                    CollaboratorError::Unreachable(_) => ENHANCE_FAILED_TEXT.to_string(),
                    CollaboratorError::Failure(_) => ENHANCE_UNEXPECTED_TEXT.to_string(),
                }
            }
        };

        let document_path = match self.store_report(record, &text, stem).await {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "report document not written");
                self.notifier.notify(notify_keys::SAVE_AI_REPORT, &e);
                None
            }
        };

        ReportOutcome {
            text,
            document_path,
        }
    }

    async fn store_report(
        &self,
        record: &PatientIntakeRecord,
        text: &str,
        stem: &PatientStem,
    ) -> IntakeResult<PathBuf> {
        let bytes = match self.render(record, Some(text.to_string())).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "report rendering failed, using built-in renderer");
                render_report_document(record, text, Local::now())
            }
        };

        let files = ArtifactService::open(&self.cfg.ai_report_dir())?;
        let stored = files.write_new(
            &stem.file_name(ArtifactKind::AiReport, DOCUMENT_EXTENSION),
            &bytes,
        )?;
        tracing::info!(
            path = %stored.path.display(),
            bytes = stored.size_bytes,
            "report saved"
        );
        Ok(stored.path)
    }

    /// Renders the intake summary, or a report when `report_text` is given, on a blocking
    /// thread.
    async fn render(
        &self,
        record: &PatientIntakeRecord,
        report_text: Option<String>,
    ) -> CollaboratorResult<Vec<u8>> {
        let renderer = Arc::clone(&self.renderer);
        let record = record.clone();

        tokio::task::spawn_blocking(move || match report_text {
            Some(text) => renderer.render_report(&record, &text),
            None => renderer.render_intake(&record),
        })
        .await
        .unwrap_or_else(|e| Err(CollaboratorError::Failure(format!("renderer panicked: {e}"))))
    }

    /// Extracts the text of a lab image into `slot` and keeps a copy of the image.
    ///
    /// Extraction failure stores `""` and copy failure only notifies.
    pub async fn attach_lab_result(
        &self,
        capture: &mut IntakeCapture,
        slot: LabSlot,
        image_path: &Path,
    ) -> LabAttachment {
        let text = match self.extract(image_path).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(slot = slot.get(), error = %e, "lab text extraction failed");
                self.notifier
                    .notify(&format!("{}{slot}", notify_keys::LAB_UPLOAD), &e);
                String::new()
            }
        };

        let (name, dob) = capture.patient_name_and_dob();
        let stem = PatientStem::now(&name, &dob);
        let copied_to = match self.copy_lab_image(image_path, &stem, slot) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(slot = slot.get(), error = %e, "lab image not copied");
                self.notifier.notify(notify_keys::LAB_COPY, &e);
                None
            }
        };

        capture.set_lab(slot, text.clone());

        LabAttachment {
            slot,
            preview: truncate_for_preview(&text),
            text,
            copied_to,
        }
    }

    async fn extract(&self, image_path: &Path) -> CollaboratorResult<String> {
        let Some(extractor) = &self.extractor else {
            return Err(CollaboratorError::Failure(
                "no text extractor is configured".into(),
            ));
        };
        with_timeout(
            self.cfg.remote_timeout(),
            extractor.extract_text(image_path),
        )
        .await
    }

    fn copy_lab_image(
        &self,
        image_path: &Path,
        stem: &PatientStem,
        slot: LabSlot,
    ) -> IntakeResult<PathBuf> {
        let bytes = fs::read(image_path).map_err(|source| IntakeError::FileRead {
            path: image_path.to_path_buf(),
            source,
        })?;
        let extension = lab_image_extension(image_path, &bytes);

        let files = ArtifactService::open(&self.cfg.lab_results_dir())?;
        let stored = files.write_new(
            &stem.file_name(ArtifactKind::LabResult(slot.get()), &extension),
            &bytes,
        )?;
        tracing::info!(
            path = %stored.path.display(),
            bytes = stored.size_bytes,
            media_type = stored.media_type.as_ref().map(|t| t.as_str()),
            "lab image copied"
        );
        Ok(stored.path)
    }

    /// Lets the operator pick a stored document and loads its record.
    ///
    /// Returns `Selection::Cancelled` when the operator backs out. Errors are notified under
    /// `SearchFileSystem` and returned.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::MissingSidecar` if the accepted document has no sidecar, or any
    /// error listing candidates or reading the sidecar.
    pub fn search_and_load(
        &self,
        prompt: &mut dyn SelectorPrompt,
        filter: PickerFilter,
    ) -> IntakeResult<Selection<LoadedIntake>> {
        let result = self
            .store
            .list_candidates(filter)
            .and_then(|candidates| {
                RecordSelector::new(candidates).run(prompt, |document| self.load_capture(document))
            });

        if let Err(e) = &result {
            self.notifier.notify(notify_keys::SEARCH_FILE_SYSTEM, e);
        }
        result
    }

    /// Loads the record paired with `document` and decodes it for editing.
    ///
    /// # Errors
    ///
    /// See [`RecordStore::load_record`].
    pub fn load_capture(&self, document: &Path) -> IntakeResult<LoadedIntake> {
        let record = self.store.load_for_document(document)?;
        Ok(LoadedIntake {
            document: document.to_path_buf(),
            capture: record.decode(),
            record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::tests::RecordingSink;
    use crate::selector::PreviewDecision;
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        cfg: Arc<IntakeConfig>,
        sink: RecordingSink,
        notifier: Arc<ErrorNotifier>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let cfg = IntakeConfig::new(
                temp.path().to_path_buf(),
                Duration::from_secs(2),
                Duration::from_millis(100),
            )
            .unwrap();
            let sink = RecordingSink::default();
            let notifier = Arc::new(ErrorNotifier::new(
                Duration::from_secs(2),
                Box::new(sink.clone()),
            ));
            Self {
                _temp: temp,
                cfg: Arc::new(cfg),
                sink,
                notifier,
            }
        }

        fn service(&self) -> IntakeService {
            IntakeService::new(Arc::clone(&self.cfg), Arc::clone(&self.notifier))
        }

        fn notified_keys(&self) -> Vec<String> {
            self.sink.0.lock().iter().map(|(k, _)| k.clone()).collect()
        }
    }

    fn capture() -> IntakeCapture {
        IntakeCapture {
            demographics: "Maria Reyes\n1978-03-14".into(),
            vitals: "120/80\n72\n16\n36.8\n98%\n170cm\n70kg".into(),
            chief_complaint: "cough".into(),
            ..IntakeCapture::default()
        }
    }

    enum Enhancer {
        Text(&'static str),
        Fail,
        Garbled,
        Hang,
    }

    #[async_trait]
    impl ReportEnhancer for Enhancer {
        async fn enhance(&self, _record: &PatientIntakeRecord) -> CollaboratorResult<String> {
            match self {
                Enhancer::Text(t) => Ok(t.to_string()),
                Enhancer::Fail => Err(CollaboratorError::Unreachable("503".into())),
                Enhancer::Garbled => Err(CollaboratorError::Failure("no report key".into())),
                Enhancer::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("late".into())
                }
            }
        }
    }

    struct Extractor(CollaboratorResult<String>);

    #[async_trait]
    impl TextExtractor for Extractor {
        async fn extract_text(&self, _image_path: &Path) -> CollaboratorResult<String> {
            self.0.clone()
        }
    }

    struct BrokenRenderer;

    impl DocumentRenderer for BrokenRenderer {
        fn render_intake(&self, _record: &PatientIntakeRecord) -> CollaboratorResult<Vec<u8>> {
            Err(CollaboratorError::Failure("engine missing".into()))
        }

        fn render_report(
            &self,
            _record: &PatientIntakeRecord,
            _report_text: &str,
        ) -> CollaboratorResult<Vec<u8>> {
            Err(CollaboratorError::Failure("engine missing".into()))
        }
    }

    #[tokio::test]
    async fn save_writes_the_pair_and_round_trips() {
        let fx = Fixture::new();
        let service = fx.service();

        let outcome = service.save_intake(&capture()).await.unwrap();

        assert!(outcome.report.is_none());
        assert!(outcome.saved.document_path.starts_with(fx.cfg.patients_dir()));
        assert!(fs::read(&outcome.saved.document_path)
            .unwrap()
            .starts_with(b"%PDF-1.4"));

        let loaded = service.load_capture(&outcome.saved.document_path).unwrap();
        assert_eq!(loaded.record, outcome.record);
        assert_eq!(loaded.capture.encode(), outcome.record);
        assert!(fx.notified_keys().is_empty());
    }

    #[tokio::test]
    async fn enhanced_report_shares_the_intake_stem() {
        let fx = Fixture::new();
        let service = fx
            .service()
            .with_enhancer(Arc::new(Enhancer::Text("All good.")));

        let outcome = service.save_intake(&capture()).await.unwrap();
        let report = outcome.report.unwrap();
        assert_eq!(report.text, "All good.");

        let report_path = report.document_path.unwrap();
        assert!(report_path.starts_with(fx.cfg.ai_report_dir()));
        let report_name = report_path.file_name().unwrap().to_string_lossy().into_owned();
        let intake_name = outcome
            .saved
            .document_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert_eq!(
            report_name.trim_end_matches("_AI.pdf"),
            intake_name.trim_end_matches("_INTAKE.pdf")
        );
    }

    #[tokio::test]
    async fn enhancement_failure_and_timeout_fall_back() {
        let fx = Fixture::new();

        let failed = fx
            .service()
            .with_enhancer(Arc::new(Enhancer::Fail))
            .save_intake(&capture())
            .await
            .unwrap();
        assert_eq!(failed.report.unwrap().text, "Error generating report.");

        let timed_out = fx
            .service()
            .with_enhancer(Arc::new(Enhancer::Hang))
            .save_intake(&capture())
            .await
            .unwrap();
        assert_eq!(timed_out.report.unwrap().text, "Request timed out.");

        // Second failure under the same key falls inside the window.
        assert_eq!(fx.notified_keys(), vec!["EnhanceReport"]);
    }

    #[tokio::test]
    async fn unexpected_enhancement_failure_has_its_own_text() {
        let fx = Fixture::new();

        let outcome = fx
            .service()
            .with_enhancer(Arc::new(Enhancer::Garbled))
            .save_intake(&capture())
            .await
            .unwrap();

        let report = outcome.report.unwrap();
        assert_eq!(report.text, "An unexpected error occurred.");
        assert!(report.document_path.is_some());
    }

    #[tokio::test]
    async fn render_failure_falls_back_to_builtin_summary() {
        let fx = Fixture::new();
        let service = fx.service().with_renderer(Arc::new(BrokenRenderer));

        let outcome = service.save_intake(&capture()).await.unwrap();

        assert!(fs::read(&outcome.saved.document_path)
            .unwrap()
            .starts_with(b"%PDF-1.4"));
        assert_eq!(fx.notified_keys(), vec!["RenderIntake"]);
    }

    #[tokio::test]
    async fn lab_attachment_stores_text_and_copies_image() {
        let fx = Fixture::new();
        let long_text = "x".repeat(2000);
        let service = fx
            .service()
            .with_extractor(Arc::new(Extractor(Ok(long_text.clone()))));

        let image = fx.cfg.records_dir().join("scan.jpeg");
        fs::write(&image, b"not really a jpeg").unwrap();

        let mut capture = capture();
        let slot = LabSlot::new(2).unwrap();
        let attachment = service
            .attach_lab_result(&mut capture, slot, &image)
            .await;

        assert_eq!(capture.lab(slot), long_text);
        assert!(attachment.preview.ends_with("\n... (truncated)"));

        let copy = attachment.copied_to.unwrap();
        assert!(copy.starts_with(fx.cfg.lab_results_dir()));
        let name = copy.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("Maria Reyes (1978-03-14) "));
        assert!(name.ends_with("_LR2.jpeg"));
    }

    #[tokio::test]
    async fn lab_extraction_failure_stores_empty_text() {
        let fx = Fixture::new();
        let service = fx.service().with_extractor(Arc::new(Extractor(Err(
            CollaboratorError::Failure("ocr down".into()),
        ))));

        let mut capture = IntakeCapture::default();
        capture.labs[2] = "old".into();
        let slot = LabSlot::new(3).unwrap();
        let attachment = service
            .attach_lab_result(&mut capture, slot, Path::new("/nonexistent/scan"))
            .await;

        assert_eq!(attachment.text, "");
        assert_eq!(capture.lab(slot), "");
        assert!(attachment.copied_to.is_none());
        assert_eq!(fx.notified_keys(), vec!["LabUpload3", "LabCopy"]);
    }

    struct Accept;

    impl SelectorPrompt for Accept {
        fn pick(&mut self, candidates: &[PathBuf]) -> Option<PathBuf> {
            candidates.first().cloned()
        }

        fn preview(&mut self, _document: &Path) -> PreviewDecision {
            PreviewDecision::UseThis
        }
    }

    #[tokio::test]
    async fn search_loads_the_picked_record() {
        let fx = Fixture::new();
        let service = fx.service();
        let saved = service.save_intake(&capture()).await.unwrap();

        match service
            .search_and_load(&mut Accept, PickerFilter::Intake)
            .unwrap()
        {
            Selection::Loaded { document, value } => {
                assert_eq!(document, saved.saved.document_path);
                assert_eq!(value.record, saved.record);
            }
            Selection::Cancelled => panic!("expected a loaded record"),
        }
    }

    #[test]
    fn search_reports_missing_sidecar() {
        let fx = Fixture::new();
        let service = fx.service();
        fs::create_dir_all(fx.cfg.patients_dir()).unwrap();
        fs::write(
            fx.cfg.patients_dir().join("A (1) 20260101_000000_000_INTAKE.pdf"),
            b"%PDF-1.4",
        )
        .unwrap();

        let err = service
            .search_and_load(&mut Accept, PickerFilter::Intake)
            .unwrap_err();

        assert!(matches!(err, IntakeError::MissingSidecar { .. }));
        assert_eq!(fx.notified_keys(), vec!["SearchFileSystem"]);
    }
}
