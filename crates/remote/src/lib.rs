//! HTTP collaborators for the intake workflow.
//!
//! Implements the [`intake_core::ReportEnhancer`] and [`intake_core::TextExtractor`] traits
//! against the clinic backend:
//!
//! - `POST {base}/enhance-patient-report` with the record as JSON
//! - `POST {base}/attachments/extract` with the image as multipart `file`
//!
//! Both clients carry a fixed request timeout. Errors are typed as [`RemoteError`] and mapped
//! into [`intake_core::CollaboratorError`] at the trait boundary, keeping timeouts distinct.

mod enhancer;
mod extractor;

pub use enhancer::{parse_enhanced_report, HttpReportEnhancer, REPORT_KEYS};
pub use extractor::HttpTextExtractor;

use intake_core::constants::DEFAULT_REMOTE_TIMEOUT;
use intake_core::CollaboratorError;
use intake_types::NonEmptyText;
use std::path::PathBuf;
use std::time::Duration;

/// Default backend address.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8080";

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("invalid remote configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to reach the backend: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("the enhanced report is missing in the JSON response. Raw:\n{0}")]
    MissingReport(String),
    #[error("failed to read {path}: {source}", path = path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

impl RemoteError {
    /// Maps into the collaborator taxonomy. Transport timeouts become `Timeout(budget)`, other
    /// transport errors and error statuses `Unreachable`, everything else `Failure`.
    pub fn into_collaborator(self, budget: Duration) -> CollaboratorError {
        match self {
            RemoteError::Http(e) if e.is_timeout() => CollaboratorError::Timeout(budget),
            e @ (RemoteError::Http(_) | RemoteError::Status { .. }) => {
                CollaboratorError::Unreachable(e.to_string())
            }
            other => CollaboratorError::Failure(other.to_string()),
        }
    }
}

/// Backend address and request budget.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    base_url: NonEmptyText,
    timeout: Duration,
}

impl RemoteConfig {
    /// # Errors
    ///
    /// Returns `RemoteError::InvalidConfig` if `base_url` is blank or `timeout` is zero.
    pub fn new(base_url: &str, timeout: Duration) -> RemoteResult<Self> {
        let base_url = NonEmptyText::new(base_url.trim().trim_end_matches('/'))
            .map_err(|_| RemoteError::InvalidConfig("base_url cannot be empty".into()))?;

        if timeout.is_zero() {
            return Err(RemoteError::InvalidConfig(
                "timeout must be greater than zero".into(),
            ));
        }

        Ok(Self { base_url, timeout })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn client(&self) -> RemoteResult<reqwest::Client> {
        Ok(reqwest::Client::builder().timeout(self.timeout).build()?)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: NonEmptyText::or_fallback(DEFAULT_BACKEND_URL, DEFAULT_BACKEND_URL),
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }
}
