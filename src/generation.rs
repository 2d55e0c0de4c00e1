//! Generation client: sends a composed prompt to a text-generation backend
//!
//! Two implementations:
//! - `OllamaClient`: POSTs `{model, prompt, stream: false}` to a local HTTP
//!   endpoint and reads `{response}` back (production)
//! - `MockGenerationClient`: returns preconfigured text per model (testing)
//!
//! The client is a pure I/O boundary and never interprets the generated text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default endpoint of a local Ollama server.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";

/// Errors from generation client operations.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation backend unreachable: {0}")]
    BackendUnreachable(String),
    #[error("generation backend error: {0}")]
    BackendError(String),
}

/// Client trait for text generation backends.
///
/// Abstracts over transport (HTTP, mock) so the pipeline doesn't depend on
/// how the model is reached.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a full (non-streamed) completion for `prompt` with `model_id`.
    async fn generate(&self, prompt: &str, model_id: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// HTTP client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a client for `endpoint`; each request is bounded by `timeout`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::BackendUnreachable(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationClient for OllamaClient {
    async fn generate(&self, prompt: &str, model_id: &str) -> Result<String, GenerationError> {
        let started = Instant::now();
        debug!(
            model = model_id,
            endpoint = %self.endpoint,
            prompt_len = prompt.len(),
            "sending generation request"
        );

        let request = GenerateRequest {
            model: model_id,
            prompt,
            stream: false,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::BackendUnreachable(format!(
                        "timed out after {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    GenerationError::BackendUnreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::BackendError(format!(
                "request failed with status {}: {}",
                status,
                body.trim()
            )));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::BackendUnreachable(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                ))
            } else {
                GenerationError::BackendError(format!("failed to read response: {}", e))
            }
        })?;
        let envelope: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            GenerationError::BackendError(format!("malformed response envelope: {}", e))
        })?;

        info!(
            model = model_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            response_len = envelope.response.len(),
            "generation complete"
        );
        Ok(envelope.response)
    }
}

/// Mock client for testing. Returns preconfigured responses.
pub struct MockGenerationClient {
    available: bool,
    responses: HashMap<String, String>,
    fallback: Option<String>,
}

impl MockGenerationClient {
    /// Create a mock client that answers requests.
    pub fn available() -> Self {
        Self {
            available: true,
            responses: HashMap::new(),
            fallback: None,
        }
    }

    /// Create a mock client whose backend cannot be reached.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            responses: HashMap::new(),
            fallback: None,
        }
    }

    /// Register the text returned for a specific model.
    pub fn with_response(mut self, model_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.responses.insert(model_id.into(), text.into());
        self
    }

    /// Text returned for any model without a registered response.
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    async fn generate(&self, _prompt: &str, model_id: &str) -> Result<String, GenerationError> {
        if !self.available {
            return Err(GenerationError::BackendUnreachable(
                "mock client configured as unavailable".to_string(),
            ));
        }

        match self.responses.get(model_id).or(self.fallback.as_ref()) {
            Some(text) => Ok(text.clone()),
            None => Err(GenerationError::BackendError(format!(
                "model '{}' not found",
                model_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn sends_non_streaming_request_and_returns_response() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::Json(serde_json::json!({
                "model": "mistral",
                "prompt": "hello",
                "stream": false
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"model":"mistral","response":"[]","done":true}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(
            format!("{}/api/generate", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        let text = client.generate("hello", "mistral").await.unwrap();

        assert_eq!(text, "[]");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_backend_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(404)
            .with_body(r#"{"error":"model 'nope' not found"}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(
            format!("{}/api/generate", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = client.generate("hello", "nope").await.unwrap_err();

        match err {
            GenerationError::BackendError(msg) => assert!(msg.contains("404")),
            other => panic!("expected BackendError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_response_field_is_backend_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_body(r#"{"done":true}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(
            format!("{}/api/generate", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = client.generate("hello", "mistral").await.unwrap_err();

        assert!(matches!(err, GenerationError::BackendError(ref m) if m.contains("envelope")));
    }

    #[test]
    fn endpoint_is_kept_as_given() {
        let client =
            OllamaClient::new("http://10.0.0.5:11434/api/generate", Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.endpoint(), "http://10.0.0.5:11434/api/generate");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_backend_unreachable() {
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let client =
            OllamaClient::new("http://127.0.0.1:9/api/generate", Duration::from_secs(2)).unwrap();
        let err = client.generate("hello", "mistral").await.unwrap_err();
        assert!(matches!(err, GenerationError::BackendUnreachable(_)));
    }

    #[test]
    fn mock_returns_registered_response() {
        let client = MockGenerationClient::available().with_response("mistral", "[]");
        let text = tokio_test::block_on(client.generate("p", "mistral")).unwrap();
        assert_eq!(text, "[]");
    }

    #[tokio::test]
    async fn mock_unavailable_client_returns_unreachable() {
        let client = MockGenerationClient::unavailable();
        let err = client.generate("p", "mistral").await.unwrap_err();
        assert!(matches!(err, GenerationError::BackendUnreachable(_)));
    }

    #[tokio::test]
    async fn mock_unknown_model_is_backend_error() {
        let client = MockGenerationClient::available();
        let err = client.generate("p", "gemma").await.unwrap_err();
        assert!(matches!(err, GenerationError::BackendError(_)));
    }
}
