//! HTTP gateway for QR Nexus.
//!
//! Exposes the AI-command proxy that QR codes point at, plus a health
//! check:
//!
//! - `GET /proxy-gemini?nexus_ai=…` (also `/.netlify/functions/proxy-gemini`)
//! - `GET /health` (`?check_provider=true` also asks the provider)
//!
//! Built on Axum. All state is immutable after startup and shared via `Arc`.

pub mod proxy;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::{Query, State},
    response::Json,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use nexus_config::AppConfig;
use nexus_core::Provider;
use nexus_dispatch::CommandDispatcher;
use nexus_security::{DecodeStats, PayloadCodec};

/// Shared application state for the gateway.
pub struct ProxyState {
    pub codec: PayloadCodec,
    pub dispatcher: CommandDispatcher,
    /// `None` when no API key is configured.
    pub provider: Option<Arc<dyn Provider>>,
}

pub type SharedState = Arc<ProxyState>;

impl ProxyState {
    pub fn new(
        codec: PayloadCodec,
        dispatcher: CommandDispatcher,
        provider: Option<Arc<dyn Provider>>,
    ) -> Self {
        Self {
            codec,
            dispatcher,
            provider,
        }
    }

    /// Build the codec, dispatcher and provider from configuration.
    ///
    /// Derives the payload key, which takes a noticeable fraction of a
    /// second; call once at startup.
    pub fn from_config(config: &AppConfig) -> Self {
        let codec = PayloadCodec::new(config.encryption_passphrase.as_deref());
        if codec.is_encrypted() {
            info!("Payload decryption enabled");
        } else {
            warn!("ENCRYPTION_PASSPHRASE is not set; payloads are decoded as plain base64");
        }

        Self::new(
            codec,
            CommandDispatcher::from_config(config),
            nexus_providers::build_from_config(config),
        )
    }
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/proxy-gemini",
            get(proxy::proxy_handler).fallback(proxy::method_not_allowed),
        )
        .route(
            "/.netlify/functions/proxy-gemini",
            get(proxy::proxy_handler).fallback(proxy::method_not_allowed),
        )
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = Arc::new(ProxyState::from_config(&config));

    let app = build_router(state)
        .layer(DefaultBodyLimit::max(config.gateway.max_body_bytes))
        .layer(tower_http::trace::TraceLayer::new_for_http());

    info!(addr = %addr, model = %config.default_model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Debug, Default, Deserialize)]
struct HealthQuery {
    #[serde(default)]
    check_provider: bool,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    passphrase_configured: bool,
    provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider_reachable: Option<bool>,
    decode: DecodeStats,
}

async fn health_handler(
    State(state): State<SharedState>,
    Query(query): Query<HealthQuery>,
) -> Json<HealthResponse> {
    let provider_reachable = if query.check_provider {
        Some(provider_reachable(&state).await)
    } else {
        None
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        passphrase_configured: state.codec.is_encrypted(),
        provider: state.provider.as_ref().map(|p| p.name().to_string()),
        provider_reachable,
        decode: state.codec.stats(),
    })
}

async fn provider_reachable(state: &ProxyState) -> bool {
    let Some(provider) = &state.provider else {
        return false;
    };
    match provider.health_check().await {
        Ok(reachable) => reachable,
        Err(e) => {
            warn!(error = %e, provider = provider.name(), "Provider health check failed");
            false
        }
    }
}
