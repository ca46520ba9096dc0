//! Google Gemini provider (Generative Language REST API).
//!
//! Sends one user turn per request:
//!
//! ```text
//! POST {base_url}/models/{model}:generateContent
//! x-goog-api-key: …
//! {"contents":[{"role":"user","parts":[{"text":"…"}]}]}
//! ```
//!
//! and returns the first candidate's first text part.

use async_trait::async_trait;
use nexus_core::error::ProviderError;
use nexus_core::provider::{PromptSpec, Provider};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Returned when the API answers with no candidates.
pub const NO_RESPONSE: &str = "No response from AI.";

/// A Gemini text-generation provider.
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Point at a different endpoint (proxy, emulator, test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn generate_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    fn request_body(prompt: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        }
    }

    fn extract_text(response: GenerateResponse) -> String {
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .unwrap_or_else(|| NO_RESPONSE.to_string())
    }

    /// Pull `error.message` out of a Gemini error body, falling back to the
    /// raw body.
    fn error_message(body: &str) -> String {
        serde_json::from_str::<ErrorEnvelope>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.to_string())
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, spec: &PromptSpec) -> std::result::Result<String, ProviderError> {
        let url = self.generate_url(&spec.model);

        debug!(model = %spec.model, prompt_len = spec.prompt.len(), "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(&spec.prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status == 404 {
            return Err(ProviderError::ModelNotFound(spec.model.clone()));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            let message = Self::error_message(&error_body);
            warn!(status, message = %message, "Gemini returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message,
            });
        }

        let api_response: GenerateResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Ok(Self::extract_text(api_response))
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- Gemini API types ---

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

    /// Serve one canned response for every request and record what arrived.
    async fn canned(status: u16, body: Value) -> (GeminiProvider, Seen) {
        let seen: Seen = Arc::default();
        let recorder = seen.clone();
        let app = axum::Router::new().fallback(
            move |uri: Uri, headers: HeaderMap, raw: Bytes| {
                let recorder = recorder.clone();
                let body = body.clone();
                async move {
                    let request = serde_json::from_slice(&raw).unwrap_or(Value::Null);
                    let key = headers
                        .get("x-goog-api-key")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    recorder
                        .lock()
                        .unwrap()
                        .push((uri.path().to_string(), key, request));
                    (StatusCode::from_u16(status).unwrap(), Json(body))
                }
            },
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let provider = GeminiProvider::new("test-key").with_base_url(format!("http://{addr}/v1beta/"));
        (provider, seen)
    }

    #[test]
    fn generate_url_accepts_prefixed_model() {
        let provider = GeminiProvider::new("k");
        assert_eq!(
            provider.generate_url("gemini-pro"),
            format!("{DEFAULT_BASE_URL}/models/gemini-pro:generateContent")
        );
        assert_eq!(
            provider.generate_url("models/gemini-pro"),
            provider.generate_url("gemini-pro")
        );
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(GeminiProvider::request_body("Hello")).unwrap();
        assert_eq!(
            body,
            json!({"contents": [{"role": "user", "parts": [{"text": "Hello"}]}]})
        );
    }

    #[test]
    fn extract_text_from_first_candidate() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "First"}]}},
                {"content": {"role": "model", "parts": [{"text": "Second"}]}}
            ],
            "usageMetadata": {"promptTokenCount": 4}
        }))
        .unwrap();
        assert_eq!(GeminiProvider::extract_text(response), "First");
    }

    #[test]
    fn extract_text_without_candidates() {
        let response: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(GeminiProvider::extract_text(response), NO_RESPONSE);
    }

    #[test]
    fn error_message_prefers_structured_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(GeminiProvider::error_message(body), "API key not valid");
        assert_eq!(GeminiProvider::error_message("Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn generate_round_trip_against_local_server() {
        let (provider, seen) = canned(
            200,
            json!({"candidates": [{"content": {"parts": [{"text": "Try Luigi's."}]}}]}),
        )
        .await;

        let text = provider
            .generate(&PromptSpec::new("gemini-pro", "Find pizza"))
            .await
            .unwrap();
        assert_eq!(text, "Try Luigi's.");

        let seen = seen.lock().unwrap();
        let (path, key, request) = &seen[0];
        assert_eq!(path, "/v1beta/models/gemini-pro:generateContent");
        assert_eq!(key.as_deref(), Some("test-key"));
        assert_eq!(request["contents"][0]["parts"][0]["text"], "Find pizza");
    }

    #[tokio::test]
    async fn status_codes_map_to_provider_errors() {
        let spec = PromptSpec::new("gemini-pro", "x");

        let (provider, _) = canned(429, json!({})).await;
        assert!(matches!(
            provider.generate(&spec).await,
            Err(ProviderError::RateLimited { .. })
        ));

        let (provider, _) = canned(403, json!({})).await;
        assert!(matches!(
            provider.generate(&spec).await,
            Err(ProviderError::AuthenticationFailed(_))
        ));

        let (provider, _) = canned(404, json!({})).await;
        assert!(matches!(
            provider.generate(&spec).await,
            Err(ProviderError::ModelNotFound(m)) if m == "gemini-pro"
        ));

        let (provider, _) = canned(500, json!({"error": {"message": "backend exploded"}})).await;
        match provider.generate(&spec).await {
            Err(ProviderError::ApiError {
                status_code,
                message,
            }) => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "backend exploded");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn health_check_lists_models() {
        let (provider, seen) = canned(200, json!({"models": []})).await;
        assert!(provider.health_check().await.unwrap());
        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen[0].0, "/v1beta/models");
            assert_eq!(seen[0].1.as_deref(), Some("test-key"));
        }

        let (provider, _) = canned(403, json!({})).await;
        assert!(!provider.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn health_check_reports_unreachable_endpoint() {
        let provider = GeminiProvider::new("k").with_base_url("http://127.0.0.1:9/v1beta");
        assert!(matches!(
            provider.health_check().await,
            Err(ProviderError::Network(_))
        ));
    }
}
