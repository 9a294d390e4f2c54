//! Intake File Storage
//!
//! This crate owns everything about *where* intake artefacts live on disk and *what they
//! are called*. It knows nothing about the structure of a patient record.
//!
//! ## Design Principles
//!
//! - Artefacts are immutable once written (a new save creates a new file)
//! - A rendered document and its JSON sidecar are paired purely by filename stem
//! - No manifest, index or embedded identifier exists
//! - Filenames are human readable and sort chronologically within a patient
//!
//! ## Filename Scheme
//!
//! ```text
//! <records>/
//! ├── Patients/
//! │   ├── Maria Reyes (1978-03-14) 20260105_140443_749_INTAKE.pdf
//! │   └── Maria Reyes (1978-03-14) 20260105_140443_749_INTAKE.json
//! ├── AI_Report/
//! │   └── Maria Reyes (1978-03-14) 20260105_140443_912_AI.pdf
//! └── Patients_Lab_Results/
//!     └── Maria Reyes (1978-03-14) 20260105_140102_031_LR1.png
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use intake_files::{ArtifactKind, ArtifactService, PatientStem};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ArtifactService::open(Path::new("intake_records/Patients"))?;
//! let stem = PatientStem::now("Maria Reyes", "1978-03-14");
//! let name = stem.file_name(ArtifactKind::Intake, "pdf");
//! service.write_new(&name, b"%PDF-1.4")?;
//! # Ok(())
//! # }
//! ```

mod constants;
mod files;
mod naming;

pub use constants::{
    AI_REPORT_SUFFIX, DEFAULT_LAB_EXTENSION, DOCUMENT_EXTENSION, INTAKE_SUFFIX, LAB_SUFFIX,
    SIDECAR_EXTENSION, UNKNOWN_DOB, UNKNOWN_PATIENT,
};
pub use files::{lab_image_extension, ArtifactService, StoredArtifact};
pub use naming::{
    is_intake_document, sanitize_for_filename, sidecar_path_for, timestamp_for_filename,
    ArtifactKind, PatientStem,
};

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Directory exists but is not a directory, or cannot be created
    #[error("Invalid directory: {0}")]
    InvalidDirectory(String),

    /// Path validation failed (a filename containing separators or a traversal component)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Target file already exists (immutability violation)
    #[error("File already exists: {0}")]
    FileAlreadyExists(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type FilesResult<T> = Result<T, FilesError>;
