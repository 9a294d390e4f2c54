//! Interfaces to the services the intake workflow consumes but does not implement.
//!
//! OCR, report enhancement and document rendering all sit behind these traits so the
//! command handlers stay testable without a network or a rendering engine.

use crate::record::PatientIntakeRecord;
use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// The service could not be reached or answered with an error status.
    #[error("{0}")]
    Unreachable(String),
    #[error("{0}")]
    Failure(String),
    #[error("request timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),
}

pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;

/// OCR of a lab result image.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, image_path: &Path) -> CollaboratorResult<String>;
}

/// Narrative report generation from a structured record.
#[async_trait]
pub trait ReportEnhancer: Send + Sync {
    async fn enhance(&self, record: &PatientIntakeRecord) -> CollaboratorResult<String>;
}

/// Document generation. Rendering is CPU-bound and runs on a blocking thread.
pub trait DocumentRenderer: Send + Sync {
    /// Renders the intake summary saved beside the sidecar.
    fn render_intake(&self, record: &PatientIntakeRecord) -> CollaboratorResult<Vec<u8>>;

    /// Renders an enhanced report for the patient of `record`.
    fn render_report(
        &self,
        record: &PatientIntakeRecord,
        report_text: &str,
    ) -> CollaboratorResult<Vec<u8>>;
}

/// Bounds `call` by `budget`, mapping expiry to `CollaboratorError::Timeout`.
pub async fn with_timeout<T>(
    budget: Duration,
    call: impl Future<Output = CollaboratorResult<T>>,
) -> CollaboratorResult<T> {
    tokio::time::timeout(budget, call)
        .await
        .unwrap_or(Err(CollaboratorError::Timeout(budget)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expiry_maps_to_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, CollaboratorError>("late".to_string())
        };
        let result = with_timeout(Duration::from_millis(10), slow).await;
        assert_eq!(result, Err(CollaboratorError::Timeout(Duration::from_millis(10))));
    }

    #[tokio::test]
    async fn results_within_budget_pass_through() {
        let quick = async { Err::<String, _>(CollaboratorError::Failure("down".into())) };
        let result = with_timeout(Duration::from_secs(1), quick).await;
        assert_eq!(result, Err(CollaboratorError::Failure("down".into())));
    }

    #[test]
    fn timeout_message_is_distinct() {
        assert_eq!(
            CollaboratorError::Timeout(Duration::from_secs(300)).to_string(),
            "request timed out after 300 seconds"
        );
    }
}
