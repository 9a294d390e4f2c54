//! Constants used throughout the intake core crate.
//!
//! This module contains folder names, defaults and fixed user-facing texts so they stay
//! consistent between the command handlers and the presentation layer.

use std::time::Duration;

/// Default root folder for intake records when no explicit folder is configured.
pub const DEFAULT_RECORDS_DIR: &str = "intake_records";

/// Folder (under the records root) holding intake documents and their sidecars.
pub const PATIENTS_DIR_NAME: &str = "Patients";

/// Folder (under the records root) holding AI-enhanced reports.
pub const AI_REPORT_DIR_NAME: &str = "AI_Report";

/// Folder (under the records root) holding copies of uploaded lab result images.
pub const LAB_RESULTS_DIR_NAME: &str = "Patients_Lab_Results";

/// Suppression window of the error notifier.
pub const DEFAULT_NOTIFY_WINDOW: Duration = Duration::from_secs(2);

/// Budget for a single remote collaborator call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Number of lab result slots on the capture surface.
pub const LAB_SLOT_COUNT: usize = 6;

/// Maximum characters of OCR text shown in a lab upload preview.
pub const LAB_PREVIEW_MAX_CHARS: usize = 1500;

/// Marker appended to a truncated preview.
pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Report text stored when the enhancement service is unreachable or returns an error status.
pub const ENHANCE_FAILED_TEXT: &str = "Error generating report.";

/// Report text stored for any other enhancement failure, such as a response without a report.
pub const ENHANCE_UNEXPECTED_TEXT: &str = "An unexpected error occurred.";

/// Report text stored when the enhancement service exceeds its budget.
pub const ENHANCE_TIMEOUT_TEXT: &str = "Request timed out.";

/// Notifier keys, one per user-visible operation.
pub mod notify_keys {
    pub const ENHANCE_REPORT: &str = "EnhanceReport";
    pub const SAVE_AI_REPORT: &str = "SaveAiReport";
    pub const RENDER_INTAKE: &str = "RenderIntake";
    pub const SEARCH_FILE_SYSTEM: &str = "SearchFileSystem";
    pub const LAB_UPLOAD: &str = "LabUpload";
    pub const LAB_COPY: &str = "LabCopy";
}
