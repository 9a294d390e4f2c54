//! Folder-scoped artefact storage
//!
//! [`ArtifactService`] writes rendered documents, JSON sidecars and lab image copies
//! into a single folder. It enforces two rules:
//!
//! - **Immutability**: a file is created once and never overwritten. Re-saving a record
//!   produces a new timestamped name instead.
//! - **Containment**: names are single path components; separators and traversal
//!   components are rejected before any I/O.
//!
//! The service performs minimal I/O in its constructor (creating the folder if needed)
//! and is cheap to construct per operation.

use crate::constants::DEFAULT_LAB_EXTENSION;
use crate::{FilesError, FilesResult};
use intake_types::NonEmptyText;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Metadata for a stored artefact
///
/// Returned from every successful write so callers can log where the artefact landed
/// without re-reading the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// Absolute or root-relative path of the stored file
    pub path: PathBuf,

    /// Size of the file in bytes
    pub size_bytes: u64,

    /// Detected media type (MIME type), if available
    ///
    /// This is a best-effort detection and should not be considered authoritative.
    pub media_type: Option<NonEmptyText>,
}

/// Service for writing and listing artefacts within one folder.
#[derive(Debug, Clone)]
pub struct ArtifactService {
    directory: PathBuf,
}

impl ArtifactService {
    /// Opens (creating if necessary) the folder at `directory`.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - the path exists but is not a directory
    /// - the directory cannot be created (I/O)
    pub fn open(directory: &Path) -> FilesResult<Self> {
        if directory.exists() && !directory.is_dir() {
            return Err(FilesError::InvalidDirectory(format!(
                "Path is not a directory: {}",
                directory.display()
            )));
        }

        fs::create_dir_all(directory).map_err(|e| {
            FilesError::InvalidDirectory(format!(
                "Cannot create directory {}: {}",
                directory.display(),
                e
            ))
        })?;

        Ok(Self {
            directory: directory.to_path_buf(),
        })
    }

    /// Returns the folder this service writes into.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Writes `bytes` to a new file called `file_name` inside the folder.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - `file_name` is not a single, plain path component
    /// - a file with that name already exists (immutability violation)
    /// - the write fails (I/O)
    pub fn write_new(&self, file_name: &str, bytes: &[u8]) -> FilesResult<StoredArtifact> {
        let target = self.resolve(file_name)?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    FilesError::FileAlreadyExists(target.display().to_string())
                } else {
                    FilesError::Io(std::io::Error::new(
                        e.kind(),
                        format!("Failed to create {}: {}", target.display(), e),
                    ))
                }
            })?;

        file.write_all(bytes).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write {}: {}", target.display(), e),
            ))
        })?;
        file.sync_all()?;

        tracing::debug!(path = %target.display(), bytes = bytes.len(), "artefact written");

        Ok(StoredArtifact {
            path: target,
            size_bytes: bytes.len() as u64,
            media_type: detect_media_type(bytes),
        })
    }

    /// Lists regular files in the folder that satisfy `filter`, newest name first.
    ///
    /// Names embed a sortable timestamp, so a reverse lexical sort groups each patient's
    /// saves newest first.
    pub fn list(&self, filter: impl Fn(&Path) -> bool) -> FilesResult<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.is_file() && filter(&path) {
                out.push(path);
            }
        }
        out.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        Ok(out)
    }

    fn resolve(&self, file_name: &str) -> FilesResult<PathBuf> {
        let candidate = Path::new(file_name);
        let is_plain = candidate.components().count() == 1
            && candidate.file_name().map(|n| n == candidate.as_os_str()) == Some(true);

        if file_name.trim().is_empty() || !is_plain {
            return Err(FilesError::InvalidPath(format!(
                "not a plain file name: '{}'",
                file_name
            )));
        }

        Ok(self.directory.join(candidate))
    }
}

/// Picks the extension for a copied lab image.
///
/// Uses the source file's own extension when present, otherwise sniffs the content,
/// otherwise falls back to `png`. The returned value has no leading dot.
pub fn lab_image_extension(source_path: &Path, bytes: &[u8]) -> String {
    source_path
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.trim().is_empty())
        .map(str::to_string)
        .or_else(|| infer::get(bytes).map(|kind| kind.extension().to_string()))
        .unwrap_or_else(|| DEFAULT_LAB_EXTENSION.to_string())
}

fn detect_media_type(bytes: &[u8]) -> Option<NonEmptyText> {
    infer::get(bytes).and_then(|kind| NonEmptyText::new(kind.mime_type()).ok())
}
