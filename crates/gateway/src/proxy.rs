//! The AI-command proxy endpoint.
//!
//! `GET /proxy-gemini?nexus_ai=<transport>`: decode the payload, render the
//! prompt, ask the provider, return `{"status":"success","aiResponse":…}`.
//! Every failure is a JSON `{"error":…,"message":…}` body with a status code
//! that tells a bad QR code (4xx) from a broken deployment (5xx).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use nexus_core::{DispatchError, Error, PayloadError, Provider, ProviderError};

use crate::{ProxyState, SharedState};

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    nexus_ai: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    status: &'static str,
    ai_response: String,
}

/// A client-visible failure.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error,
            message: message.into(),
        }
    }

    /// Map a pipeline error to its response. Decode failures are labelled by
    /// whether a passphrase is configured.
    fn from_error(err: Error, encrypted: bool) -> Self {
        match err {
            Error::Payload(PayloadError::MissingCommand) => Self::new(
                StatusCode::BAD_REQUEST,
                "Bad Request",
                "AI command (cmd) is missing from payload.",
            ),
            Error::Payload(_) if encrypted => Self::new(
                StatusCode::BAD_REQUEST,
                "Decryption/Decoding Error",
                "Could not decrypt or decode AI command payload. Invalid passphrase or data format.",
            ),
            Error::Payload(_) => Self::new(
                StatusCode::BAD_REQUEST,
                "Decoding Error",
                "Could not decode AI command payload. Malformed Base64 data.",
            ),
            Error::Dispatch(DispatchError::UnknownCommand(_)) => {
                Self::new(StatusCode::BAD_REQUEST, "Bad Request", "Unknown AI command.")
            }
            Error::Dispatch(e @ DispatchError::MissingParameter { .. }) => {
                Self::new(StatusCode::BAD_REQUEST, "Bad Request", format!("{e}."))
            }
            Error::Provider(ProviderError::NotConfigured(_)) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server configuration error",
                "API key not found.",
            ),
            Error::Provider(e) => Self::new(
                StatusCode::BAD_GATEWAY,
                "Upstream Error",
                format!("Text generation failed: {e}"),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

pub async fn proxy_handler(
    State(state): State<SharedState>,
    Query(query): Query<ProxyQuery>,
) -> Result<Json<ProxyResponse>, ApiError> {
    let encrypted = state.codec.is_encrypted();

    let Some(provider) = state.provider.clone() else {
        error!("No provider configured (missing API key)");
        let err = ProviderError::NotConfigured("no API key".into());
        return Err(ApiError::from_error(err.into(), encrypted));
    };

    let transport = query.nexus_ai.filter(|t| !t.is_empty()).ok_or_else(|| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "Bad Request",
            "Missing nexus_ai query parameter.",
        )
    })?;

    let ai_response = answer(&state, provider.as_ref(), &transport)
        .await
        .map_err(|e| {
            match &e {
                Error::Provider(_) => {
                    error!(error = %e, provider = provider.name(), "Text generation failed")
                }
                _ => warn!(error = %e, transport_len = transport.len(), "Rejected AI command"),
            }
            ApiError::from_error(e, encrypted)
        })?;

    Ok(Json(ProxyResponse {
        status: "success",
        ai_response,
    }))
}

/// Decode, render and generate.
async fn answer(
    state: &ProxyState,
    provider: &dyn Provider,
    transport: &str,
) -> nexus_core::Result<String> {
    let decoded = state.codec.decode(transport)?;
    let spec = state.dispatcher.dispatch(&decoded.command)?;

    info!(
        command = %decoded.command.command,
        path = ?decoded.path,
        provider = provider.name(),
        "Dispatching AI command"
    );

    Ok(provider.generate(&spec).await?)
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        "Method Not Allowed",
        "Only GET requests are accepted for AI commands via QR scan.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use async_trait::async_trait;
    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use nexus_core::{DecodedCommand, PromptSpec};
    use nexus_dispatch::CommandDispatcher;
    use nexus_security::{PayloadCodec, encode_plain};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    /// Echoes the prompt back and remembers what it was asked.
    #[derive(Default)]
    struct EchoProvider {
        prompts: Mutex<Vec<PromptSpec>>,
        fail: bool,
    }

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, spec: &PromptSpec) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(spec.clone());
            if self.fail {
                return Err(ProviderError::RateLimited {
                    retry_after_secs: 5,
                });
            }
            Ok(format!("echo: {}", spec.prompt))
        }
    }

    fn app_with(codec: PayloadCodec, provider: Option<Arc<EchoProvider>>) -> Router {
        let provider = provider.map(|p| p as Arc<dyn Provider>);
        build_router(Arc::new(ProxyState::new(
            codec,
            CommandDispatcher::default(),
            provider,
        )))
    }

    fn app() -> Router {
        app_with(PayloadCodec::plain(), Some(Arc::new(EchoProvider::default())))
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn plain(cmd: &DecodedCommand) -> String {
        encode_plain(cmd).unwrap()
    }

    #[tokio::test]
    async fn plain_command_round_trip() {
        let provider = Arc::new(EchoProvider::default());
        let app = app_with(PayloadCodec::plain(), Some(provider.clone()));
        let transport = plain(&DecodedCommand::new("contextual-search").with_param("intent", "pizza"));

        let (status, json) = call(app, "GET", &format!("/proxy-gemini?nexus_ai={transport}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert!(
            json["aiResponse"]
                .as_str()
                .unwrap()
                .contains(r#"Perform a smart search for: "pizza""#)
        );

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].model, "gemini-pro");
    }

    #[tokio::test]
    async fn encrypted_command_round_trip() {
        let codec = PayloadCodec::from_key([42u8; 32]);
        let transport = codec
            .seal(&DecodedCommand::new("customer-support").with_param("userName", "Ada"))
            .unwrap();
        let app = app_with(codec, Some(Arc::new(EchoProvider::default())));

        let (status, json) = call(
            app.clone(),
            "GET",
            &format!("/.netlify/functions/proxy-gemini?nexus_ai={transport}"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["aiResponse"].as_str().unwrap().contains("Ada's inquiry"));

        let (_, health) = call(app, "GET", "/health").await;
        assert_eq!(health["passphrase_configured"], true);
        assert_eq!(health["decode"]["decrypted"], 1);
    }

    #[tokio::test]
    async fn plain_payload_behind_passphrase_is_served_and_counted() {
        let app = app_with(
            PayloadCodec::from_key([42u8; 32]),
            Some(Arc::new(EchoProvider::default())),
        );
        let transport = plain(&DecodedCommand::new("product-info").with_param("productId", "SKU-9"));

        let (status, _) = call(app.clone(), "GET", &format!("/proxy-gemini?nexus_ai={transport}")).await;
        assert_eq!(status, StatusCode::OK);

        let (_, health) = call(app, "GET", "/health").await;
        assert_eq!(health["decode"]["fallbacks"], 1);
    }

    #[tokio::test]
    async fn missing_parameter_is_bad_request() {
        for uri in ["/proxy-gemini", "/proxy-gemini?nexus_ai="] {
            let (status, json) = call(app(), "GET", uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"], "Bad Request");
            assert_eq!(json["message"], "Missing nexus_ai query parameter.");
        }
    }

    #[tokio::test]
    async fn undecodable_payload_labels_depend_on_mode() {
        let (status, json) = call(app(), "GET", "/proxy-gemini?nexus_ai=%25%25%25").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Decoding Error");

        let keyed = app_with(
            PayloadCodec::from_key([1u8; 32]),
            Some(Arc::new(EchoProvider::default())),
        );
        let (status, json) = call(keyed, "GET", "/proxy-gemini?nexus_ai=%25%25%25").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Decryption/Decoding Error");
    }

    #[tokio::test]
    async fn missing_command_is_bad_request() {
        // "e30" is base64 for "{}"
        let (status, json) = call(app(), "GET", "/proxy-gemini?nexus_ai=e30").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().contains("cmd"));
    }

    #[tokio::test]
    async fn unknown_command_is_bad_request() {
        let transport = plain(&DecodedCommand::new("unknown-foo"));
        let (status, json) = call(app(), "GET", &format!("/proxy-gemini?nexus_ai={transport}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Unknown AI command.");
    }

    #[tokio::test]
    async fn missing_api_key_is_server_error() {
        let app = app_with(PayloadCodec::plain(), None);
        let transport = plain(&DecodedCommand::new("contextual-search"));
        let (status, json) = call(app, "GET", &format!("/proxy-gemini?nexus_ai={transport}")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Server configuration error");
    }

    #[tokio::test]
    async fn provider_failure_is_bad_gateway() {
        let provider = Arc::new(EchoProvider {
            fail: true,
            ..EchoProvider::default()
        });
        let app = app_with(PayloadCodec::plain(), Some(provider));
        let transport = plain(&DecodedCommand::new("location-assistant"));
        let (status, json) = call(app, "GET", &format!("/proxy-gemini?nexus_ai={transport}")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"], "Upstream Error");
    }

    #[tokio::test]
    async fn non_get_is_method_not_allowed() {
        let (status, json) = call(app(), "POST", "/proxy-gemini?nexus_ai=e30").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json["error"], "Method Not Allowed");
    }
}
