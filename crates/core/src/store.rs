//! Record store.
//!
//! Persists a [`PatientIntakeRecord`] as a rendered document plus a JSON sidecar sharing the
//! same filename stem, and reads it back from the sidecar alone. The rendered document is
//! never parsed.

use crate::config::IntakeConfig;
use crate::record::PatientIntakeRecord;
use crate::{IntakeError, IntakeResult};
use chrono::{DateTime, Local};
use intake_files::{
    is_intake_document, sidecar_path_for, ArtifactKind, ArtifactService, PatientStem,
    DOCUMENT_EXTENSION,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Which stored documents a picker offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickerFilter {
    /// `*_INTAKE.*`, excluding the sidecars themselves.
    #[default]
    Intake,
    /// Any `*.pdf`.
    AnyDocument,
}

impl PickerFilter {
    pub fn matches(self, path: &Path) -> bool {
        match self {
            PickerFilter::Intake => {
                is_intake_document(path) && !has_extension(path, "json")
            }
            PickerFilter::AnyDocument => has_extension(path, DOCUMENT_EXTENSION),
        }
    }

    /// Glob-style pattern shown to operators.
    pub fn pattern(self) -> &'static str {
        match self {
            PickerFilter::Intake => "*_INTAKE.*",
            PickerFilter::AnyDocument => "*.pdf",
        }
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

/// Paths of one saved document/sidecar pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRecord {
    pub document_path: PathBuf,
    pub sidecar_path: PathBuf,
}

/// Reads and writes intake records in one folder.
#[derive(Debug, Clone)]
pub struct RecordStore {
    directory: PathBuf,
}

impl RecordStore {
    /// Store over the configured patients folder.
    pub fn new(cfg: &IntakeConfig) -> Self {
        Self::with_directory(cfg.patients_dir())
    }

    pub fn with_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Saves `record` stamped with the current local time.
    ///
    /// See [`RecordStore::save_record_at`].
    pub fn save_record(
        &self,
        record: &PatientIntakeRecord,
        document: &[u8],
    ) -> IntakeResult<SavedRecord> {
        self.save_record_at(record, document, Local::now())
    }

    /// Writes the rendered `document`, then the pretty-printed JSON sidecar beside it.
    ///
    /// Both files are created new; an existing file with the same name is never replaced.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::Serialization` if the record cannot be serialised, and
    /// `IntakeError::Files` if the folder cannot be created or either file cannot be written.
    pub fn save_record_at(
        &self,
        record: &PatientIntakeRecord,
        document: &[u8],
        at: DateTime<Local>,
    ) -> IntakeResult<SavedRecord> {
        let json = serde_json::to_vec_pretty(record).map_err(IntakeError::Serialization)?;

        let stem = PatientStem::new(
            &record.demographics.full_name,
            &record.demographics.date_of_birth,
            at,
        );
        let files = ArtifactService::open(&self.directory)?;

        let document = files.write_new(
            &stem.file_name(ArtifactKind::Intake, DOCUMENT_EXTENSION),
            document,
        )?;
        let sidecar_name = file_name_of(&sidecar_path_for(&document.path));
        let sidecar = files.write_new(&sidecar_name, &json)?;

        tracing::info!(
            document = %document.path.display(),
            sidecar = %sidecar.path.display(),
            document_bytes = document.size_bytes,
            "intake record saved"
        );

        Ok(SavedRecord {
            document_path: document.path,
            sidecar_path: sidecar.path,
        })
    }

    /// Loads the record stored in the sidecar of `path`.
    ///
    /// `path` may name the sidecar itself or any document sharing its stem; the pairing rule
    /// resolves both to the same `.json` file.
    ///
    /// # Errors
    ///
    /// - `IntakeError::MissingSidecar` if the sidecar does not exist
    /// - `IntakeError::FileRead` if it cannot be read
    /// - `IntakeError::Deserialization` with the JSON path of the offending value
    pub fn load_record(&self, path: &Path) -> IntakeResult<PatientIntakeRecord> {
        let sidecar = sidecar_path_for(path);

        if !sidecar.is_file() {
            return Err(IntakeError::MissingSidecar {
                expected: file_name_of(&sidecar),
                path: sidecar,
            });
        }

        let text = fs::read_to_string(&sidecar).map_err(|source| IntakeError::FileRead {
            path: sidecar.clone(),
            source,
        })?;

        let mut deserializer = serde_json::Deserializer::from_str(&text);
        let record = match serde_path_to_error::deserialize::<_, PatientIntakeRecord>(
            &mut deserializer,
        ) {
            Ok(record) => record,
            Err(err) => {
                let path = err.path().to_string();
                let path = if path.is_empty() || path == "." {
                    "<root>".to_string()
                } else {
                    path
                };
                return Err(IntakeError::Deserialization {
                    path,
                    source: err.into_inner(),
                });
            }
        };

        tracing::info!(sidecar = %sidecar.display(), "intake record loaded");
        Ok(record)
    }

    /// Loads the record paired with a rendered document.
    pub fn load_for_document(&self, document: &Path) -> IntakeResult<PatientIntakeRecord> {
        self.load_record(&sidecar_path_for(document))
    }

    /// Stored documents matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::Files` if the folder cannot be created or read.
    pub fn list_candidates(&self, filter: PickerFilter) -> IntakeResult<Vec<PathBuf>> {
        let files = ArtifactService::open(&self.directory)?;
        Ok(files.list(|path| filter.matches(path))?)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
