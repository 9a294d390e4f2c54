use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(
        "This INTAKE document has no matching .json data file.\n\n\
         Expected sidecar:\n{expected}\n\n\
         Fix:\nWhen saving the INTAKE document, also save the JSON beside it.\n\
         Once the JSON exists, search will load the patient correctly."
    )]
    MissingSidecar { expected: String, path: PathBuf },
    #[error("failed to read intake sidecar {path}: {source}", path = path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize intake record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize intake sidecar at {path}: {source}")]
    Deserialization {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("file storage error: {0}")]
    Files(#[from] intake_files::FilesError),
}

pub type IntakeResult<T> = std::result::Result<T, IntakeError>;
