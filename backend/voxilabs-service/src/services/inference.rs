/// Text-to-video inference providers
use crate::config::InferenceSettings;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client as HttpClient;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("inference provider is not configured")]
    NotConfigured,

    #[error("provider returned no data")]
    NoData,

    #[error("provider returned {0}")]
    UnexpectedFormat(String),

    #[error("provider request timed out")]
    Timeout,

    #[error("provider request failed: {0}")]
    Upstream(String),
}

/// Raw provider output, not yet validated as a video
#[derive(Debug, Clone)]
pub struct InferenceOutput {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn text_to_video(&self, prompt: &str) -> Result<InferenceOutput, InferenceError>;

    /// False when the provider cannot serve requests at all (missing credentials)
    fn is_available(&self) -> bool {
        true
    }
}

/// Hosted inference API: `POST {base_url}/models/{model}` with `{"inputs": prompt}`
pub struct HuggingFaceClient {
    http: HttpClient,
    api_token: Option<String>,
    endpoint: String,
}

impl HuggingFaceClient {
    pub fn new(settings: &InferenceSettings) -> Result<Self, InferenceError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| InferenceError::Upstream(format!("failed to build HTTP client: {e}")))?;

        if settings.api_token.is_none() {
            warn!("HF_TOKEN not set; video generation is unavailable");
        }

        Ok(Self {
            http,
            api_token: settings.api_token.clone(),
            endpoint: format!("{}/models/{}", settings.base_url, settings.model),
        })
    }
}

#[async_trait]
impl InferenceProvider for HuggingFaceClient {
    async fn text_to_video(&self, prompt: &str) -> Result<InferenceOutput, InferenceError> {
        let token = self.api_token.as_ref().ok_or(InferenceError::NotConfigured)?;

        debug!(endpoint = %self.endpoint, "Requesting text-to-video inference");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&serde_json::json!({ "inputs": prompt }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout
                } else {
                    InferenceError::Upstream(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.chars().take(200).collect();
            return Err(match status {
                StatusCode::GATEWAY_TIMEOUT => InferenceError::Timeout,
                _ => InferenceError::Upstream(format!("status {status}: {detail}")),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| InferenceError::Upstream(e.to_string()))?;

        if bytes.is_empty() {
            return Err(InferenceError::NoData);
        }

        Ok(InferenceOutput {
            bytes,
            content_type,
        })
    }

    fn is_available(&self) -> bool {
        self.api_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base: &str, token: Option<&str>) -> InferenceSettings {
        InferenceSettings {
            api_token: token.map(str::to_string),
            base_url: base.to_string(),
            model: "acme/t2v".to_string(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_missing_token_is_unavailable() {
        let client = HuggingFaceClient::new(&settings("http://unused", None)).unwrap();
        assert!(!client.is_available());
        assert!(matches!(
            client.text_to_video("a cat").await.unwrap_err(),
            InferenceError::NotConfigured
        ));
    }

    #[tokio::test]
    async fn test_posts_prompt_and_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/acme/t2v"))
            .and(header("authorization", "Bearer hf_test"))
            .and(body_json(serde_json::json!({"inputs": "a cat surfing"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "video/mp4")
                    .set_body_bytes(b"\0\0\0\x10ftypisom".to_vec()),
            )
            .mount(&server)
            .await;

        let client = HuggingFaceClient::new(&settings(&server.uri(), Some("hf_test"))).unwrap();
        let output = client.text_to_video("a cat surfing").await.unwrap();

        assert_eq!(output.content_type.as_deref(), Some("video/mp4"));
        assert_eq!(&output.bytes[4..8], b"ftyp");
    }

    #[tokio::test]
    async fn test_empty_body_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = HuggingFaceClient::new(&settings(&server.uri(), Some("hf_test"))).unwrap();
        assert!(matches!(
            client.text_to_video("x").await.unwrap_err(),
            InferenceError::NoData
        ));
    }

    #[tokio::test]
    async fn test_error_status_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
            .mount(&server)
            .await;

        let client = HuggingFaceClient::new(&settings(&server.uri(), Some("hf_test"))).unwrap();
        match client.text_to_video("x").await.unwrap_err() {
            InferenceError::Upstream(detail) => assert!(detail.contains("model loading")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
