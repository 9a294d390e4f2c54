//! Lab image OCR over HTTP.

use crate::{RemoteConfig, RemoteError, RemoteResult};
use async_trait::async_trait;
use intake_core::{CollaboratorResult, TextExtractor};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;

const EXTRACT_PATH: &str = "attachments/extract";

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    extracted_text: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ExtractResponse {
    /// The extracted text, or the backend's message when nothing was extracted.
    fn into_text(self) -> String {
        match self.extracted_text {
            Some(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => self.message.unwrap_or_default(),
        }
    }
}

pub struct HttpTextExtractor {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl HttpTextExtractor {
    /// # Errors
    ///
    /// Returns `RemoteError::Http` if the HTTP client cannot be built.
    pub fn new(config: RemoteConfig) -> RemoteResult<Self> {
        Ok(Self {
            client: config.client()?,
            config,
        })
    }

    /// Uploads the image at `image_path` and returns its text.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the image cannot be read, the request fails, or the backend
    /// answers with a non-success status.
    pub async fn request_text(&self, image_path: &Path) -> RemoteResult<String> {
        let bytes = tokio::fs::read(image_path)
            .await
            .map_err(|source| RemoteError::ReadFile {
                path: image_path.to_path_buf(),
                source,
            })?;
        let file_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        let url = self.config.endpoint(EXTRACT_PATH);
        tracing::debug!(%url, image = %image_path.display(), "requesting text extraction");

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json::<ExtractResponse>().await?.into_text())
    }
}

#[async_trait]
impl TextExtractor for HttpTextExtractor {
    async fn extract_text(&self, image_path: &Path) -> CollaboratorResult<String> {
        self.request_text(image_path)
            .await
            .map_err(|e| e.into_collaborator(self.config.timeout()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_core::CollaboratorError;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor_for(server: &MockServer) -> HttpTextExtractor {
        HttpTextExtractor::new(RemoteConfig::new(&server.uri(), Duration::from_secs(5)).unwrap())
            .unwrap()
    }

    fn image(temp: &TempDir) -> std::path::PathBuf {
        let path = temp.path().join("cbc.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\n").unwrap();
        path
    }

    #[tokio::test]
    async fn uploads_the_image_and_returns_trimmed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/attachments/extract"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "extracted_text": "  Hb 13.2 g/dL\n",
                "message": "ok"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let text = extractor_for(&server)
            .extract_text(&image(&temp))
            .await
            .unwrap();
        assert_eq!(text, "Hb 13.2 g/dL");

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"file\""));
        assert!(body.contains("filename=\"cbc.png\""));
    }

    #[tokio::test]
    async fn empty_text_falls_back_to_the_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/attachments/extract"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "extracted_text": "",
                "message": "No readable text found."
            })))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let text = extractor_for(&server)
            .extract_text(&image(&temp))
            .await
            .unwrap();
        assert_eq!(text, "No readable text found.");
    }

    #[tokio::test]
    async fn unreadable_image_is_a_failure() {
        let server = MockServer::start().await;
        let result = extractor_for(&server)
            .extract_text(Path::new("/nonexistent/cbc.png"))
            .await;
        assert!(matches!(result, Err(CollaboratorError::Failure(_))));
    }
}
