//! Deterministic artefact filenames.
//!
//! Every artefact belonging to one save shares a *stem*:
//! `{name} ({date of birth}) {yyyyMMdd_HHmmss_fff}` followed by a kind suffix and an
//! extension. The sidecar of a document is found purely by swapping the extension for
//! `.json`; no other indirection exists.

use crate::constants::{
    AI_REPORT_SUFFIX, INTAKE_SUFFIX, LAB_SUFFIX, SIDECAR_EXTENSION, UNKNOWN_DOB, UNKNOWN_PATIENT,
};
use chrono::{DateTime, Local};
use intake_types::NonEmptyText;
use std::path::{Path, PathBuf};

/// Characters that are reserved in filenames on at least one supported platform.
const RESERVED_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replaces every filesystem-reserved character with `_`, trims surrounding whitespace
/// and strips trailing dots and spaces.
///
/// ASCII control characters count as reserved. The result may be empty; callers that need
/// a non-empty part use [`PatientStem`], which substitutes a fallback.
pub fn sanitize_for_filename(input: &str) -> String {
    let replaced: String = input
        .chars()
        .map(|c| {
            if RESERVED_FILENAME_CHARS.contains(&c) || c.is_ascii_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    replaced
        .trim()
        .trim_end_matches(['.', ' '])
        .to_string()
}

/// Formats a timestamp as `yyyyMMdd_HHmmss_fff` (local time, millisecond resolution).
pub fn timestamp_for_filename(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S_%3f").to_string()
}

/// Resolves the sidecar path of a document by replacing its extension with `.json`.
pub fn sidecar_path_for(document: &Path) -> PathBuf {
    document.with_extension(SIDECAR_EXTENSION)
}

/// Returns true if the file stem ends with `_INTAKE` (any extension).
pub fn is_intake_document(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem.ends_with(INTAKE_SUFFIX))
}

/// The kind of artefact a filename identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Rendered intake summary (paired with a JSON sidecar).
    Intake,
    /// AI-enhanced narrative report.
    AiReport,
    /// Copy of an uploaded lab result image for the given slot.
    LabResult(u8),
}

impl ArtifactKind {
    fn suffix(self) -> String {
        match self {
            ArtifactKind::Intake => INTAKE_SUFFIX.to_string(),
            ArtifactKind::AiReport => AI_REPORT_SUFFIX.to_string(),
            ArtifactKind::LabResult(slot) => format!("{LAB_SUFFIX}{slot}"),
        }
    }
}

/// The shared stem of every artefact produced by one save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientStem {
    name: NonEmptyText,
    date_of_birth: NonEmptyText,
    stamp: String,
}

impl PatientStem {
    /// Builds a stem from raw demographics and an explicit timestamp.
    ///
    /// Both parts are sanitised; a part that sanitises to nothing falls back to
    /// `Unknown Patient` / `Unknown DOB`.
    pub fn new(full_name: &str, date_of_birth: &str, at: DateTime<Local>) -> Self {
        Self {
            name: NonEmptyText::or_fallback(sanitize_for_filename(full_name), UNKNOWN_PATIENT),
            date_of_birth: NonEmptyText::or_fallback(
                sanitize_for_filename(date_of_birth),
                UNKNOWN_DOB,
            ),
            stamp: timestamp_for_filename(at),
        }
    }

    /// Builds a stem stamped with the current local time.
    pub fn now(full_name: &str, date_of_birth: &str) -> Self {
        Self::new(full_name, date_of_birth, Local::now())
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn date_of_birth(&self) -> &str {
        self.date_of_birth.as_str()
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    /// Returns `{name} ({dob}) {stamp}{suffix}.{extension}`.
    ///
    /// `extension` may be given with or without its leading dot.
    pub fn file_name(&self, kind: ArtifactKind, extension: &str) -> String {
        format!(
            "{} ({}) {}{}.{}",
            self.name,
            self.date_of_birth,
            self.stamp,
            kind.suffix(),
            extension.trim_start_matches('.')
        )
    }
}
