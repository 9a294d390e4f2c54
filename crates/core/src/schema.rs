//! Versioned record schema.
//!
//! Each capture section maps its lines, by position, onto a fixed ordered list of record
//! keys followed by one overflow key. The list lives in a single `const` per section
//! ([`crate::Section::SCHEMA`]), generated together with the serde field names of the
//! section struct, so the encoder, the decoder and the sidecar format read the same list.
//!
//! Adding, removing or reordering a key changes the meaning of stored captures and must bump
//! [`SCHEMA_VERSION`].

/// Version of the positional section layout.
pub const SCHEMA_VERSION: u32 = 1;

/// Value stored for an ordinal line the capture did not provide.
pub const PLACEHOLDER: &str = "N/A";

/// One named record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Sidecar JSON key.
    pub key: &'static str,
    /// Human readable label used in rendered documents.
    pub label: &'static str,
}

/// Positional layout of one capture section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSchema {
    /// Capture key of the section (`demographics`, `vitals`, ...).
    pub key: &'static str,
    pub title: &'static str,
    /// Ordinal fields, in line order.
    pub fields: &'static [FieldSpec],
    /// Field receiving every line past the last ordinal.
    pub overflow: FieldSpec,
}

impl SectionSchema {
    pub const fn ordinal_count(&self) -> usize {
        self.fields.len()
    }
}

/// Chief complaint is captured as one trimmed free-text field with no ordinal split.
pub const CHIEF_COMPLAINT: FieldSpec = FieldSpec {
    key: "ChiefComplaint",
    label: "Chief Complaint",
};

/// Capture key of the chief complaint.
pub const CHIEF_COMPLAINT_KEY: &str = "chief-complaint";

/// Capture key prefix of the lab slots (`lab-1` .. `lab-6`).
pub const LAB_KEY_PREFIX: &str = "lab-";
