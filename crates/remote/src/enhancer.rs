//! Report enhancement over HTTP.

use crate::{RemoteConfig, RemoteError, RemoteResult};
use async_trait::async_trait;
use intake_core::{CollaboratorResult, PatientIntakeRecord, ReportEnhancer};
use serde_json::Value;

const ENHANCE_PATH: &str = "enhance-patient-report";

/// Response keys that may carry the report, in priority order.
pub const REPORT_KEYS: &[&str] = &[
    "enhanced_report",
    "enhancedReport",
    "enhanced_report_text",
    "enhancedReportText",
    "enhanced",
    "report",
    "enhanced_report_md",
    "enhancedReportMd",
];

pub struct HttpReportEnhancer {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl HttpReportEnhancer {
    /// # Errors
    ///
    /// Returns `RemoteError::Http` if the HTTP client cannot be built.
    pub fn new(config: RemoteConfig) -> RemoteResult<Self> {
        Ok(Self {
            client: config.client()?,
            config,
        })
    }

    /// Posts `record` and returns the report text from the response.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport errors, non-success statuses, or a JSON response
    /// without a report.
    pub async fn request_report(&self, record: &PatientIntakeRecord) -> RemoteResult<String> {
        let url = self.config.endpoint(ENHANCE_PATH);
        tracing::debug!(%url, "requesting enhanced report");

        let response = self.client.post(&url).json(record).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_enhanced_report(&body)
    }
}

#[async_trait]
impl ReportEnhancer for HttpReportEnhancer {
    async fn enhance(&self, record: &PatientIntakeRecord) -> CollaboratorResult<String> {
        self.request_report(record)
            .await
            .map_err(|e| e.into_collaborator(self.config.timeout()))
    }
}

/// Extracts the report text from a response body.
///
/// A body that does not start like JSON, or fails to parse, is the report itself. A JSON
/// object yields the first key of [`REPORT_KEYS`] it contains (strings verbatim, other values
/// pretty-printed); a JSON string yields its value; anything else is pretty-printed.
///
/// # Errors
///
/// Returns `RemoteError::MissingReport` for an object without a report key, or whose report
/// key is `null`.
pub fn parse_enhanced_report(body: &str) -> RemoteResult<String> {
    let start = body.trim_start();
    if !(start.starts_with('{') || start.starts_with('[') || start.starts_with('"')) {
        return Ok(body.to_string());
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return Ok(body.to_string()),
    };

    match value {
        Value::Object(map) => {
            let report = REPORT_KEYS.iter().find_map(|key| map.get(*key));
            match report {
                None | Some(Value::Null) => Err(RemoteError::MissingReport(body.to_string())),
                Some(Value::String(text)) => Ok(text.clone()),
                Some(other) => Ok(pretty(other)),
            }
        }
        Value::String(text) => Ok(text),
        other => Ok(pretty(&other)),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_core::{CollaboratorError, IntakeCapture};
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn enhancer_for(server: &MockServer, timeout: Duration) -> HttpReportEnhancer {
        HttpReportEnhancer::new(RemoteConfig::new(&server.uri(), timeout).unwrap()).unwrap()
    }

    fn record() -> PatientIntakeRecord {
        IntakeCapture {
            demographics: "Maria Reyes\n1978-03-14".into(),
            ..IntakeCapture::default()
        }
        .encode()
    }

    #[test]
    fn plain_text_is_returned_raw() {
        assert_eq!(parse_enhanced_report("Patient is well.").unwrap(), "Patient is well.");
        assert_eq!(parse_enhanced_report("{not json").unwrap(), "{not json");
    }

    #[test]
    fn first_present_key_wins() {
        let body = r#"{ "report": "second", "enhancedReport": "first" }"#;
        assert_eq!(parse_enhanced_report(body).unwrap(), "first");
    }

    #[test]
    fn null_or_missing_report_is_an_error() {
        assert!(matches!(
            parse_enhanced_report(r#"{ "enhanced_report": null, "report": "x" }"#),
            Err(RemoteError::MissingReport(_))
        ));
        assert!(matches!(
            parse_enhanced_report(r#"{ "status": "ok" }"#),
            Err(RemoteError::MissingReport(_))
        ));
    }

    #[test]
    fn non_string_values_are_pretty_printed() {
        let body = r#"{ "enhanced": { "summary": "ok" } }"#;
        assert_eq!(
            parse_enhanced_report(body).unwrap(),
            "{\n  \"summary\": \"ok\"\n}"
        );
        assert_eq!(parse_enhanced_report(r#""quoted""#).unwrap(), "quoted");
        assert_eq!(parse_enhanced_report("[1]").unwrap(), "[\n  1\n]");
    }

    #[tokio::test]
    async fn posts_the_record_and_reads_the_report() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/enhance-patient-report"))
            .and(body_partial_json(serde_json::json!({ "FullName": "Maria Reyes" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "enhanced_report": "## Summary" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let enhancer = enhancer_for(&server, Duration::from_secs(5));
        assert_eq!(enhancer.enhance(&record()).await.unwrap(), "## Summary");
    }

    #[tokio::test]
    async fn server_errors_are_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/enhance-patient-report"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model offline"))
            .mount(&server)
            .await;

        let enhancer = enhancer_for(&server, Duration::from_secs(5));
        match enhancer.enhance(&record()).await {
            Err(CollaboratorError::Unreachable(message)) => assert!(message.contains("500")),
            other => panic!("expected unreachable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn response_without_report_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/enhance-patient-report"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"ok"}"#))
            .mount(&server)
            .await;

        let enhancer = enhancer_for(&server, Duration::from_secs(5));
        match enhancer.enhance(&record()).await {
            Err(CollaboratorError::Failure(message)) => assert!(message.contains("missing")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_responses_time_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/enhance-patient-report"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let enhancer = enhancer_for(&server, Duration::from_millis(200));
        assert_eq!(
            enhancer.enhance(&record()).await,
            Err(CollaboratorError::Timeout(Duration::from_millis(200)))
        );
    }
}
