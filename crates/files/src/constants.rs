//! Filename constants shared by the naming scheme and the storage service.

/// Stem suffix of a rendered intake summary.
pub const INTAKE_SUFFIX: &str = "_INTAKE";

/// Stem suffix of an AI-enhanced report.
pub const AI_REPORT_SUFFIX: &str = "_AI";

/// Stem suffix prefix of a lab result image copy; the slot number follows.
pub const LAB_SUFFIX: &str = "_LR";

/// Extension of rendered documents.
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Extension of the structured record sidecar.
pub const SIDECAR_EXTENSION: &str = "json";

/// Extension used for lab images when neither the source path nor the content reveals one.
pub const DEFAULT_LAB_EXTENSION: &str = "png";

/// Name part used when the patient name sanitises to nothing.
pub const UNKNOWN_PATIENT: &str = "Unknown Patient";

/// Date-of-birth part used when the date of birth sanitises to nothing.
pub const UNKNOWN_DOB: &str = "Unknown DOB";
