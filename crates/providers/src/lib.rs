//! Text-generation provider implementations for QR Nexus.
//!
//! All providers implement the `nexus_core::Provider` trait.
//! [`build_from_config`] picks the configured one.

pub mod gemini;

pub use gemini::GeminiProvider;

use nexus_config::AppConfig;
use nexus_core::Provider;
use std::sync::Arc;

/// Build the default provider from configuration.
///
/// Returns `None` when no API key is configured; the gateway then answers
/// every command with a configuration error instead of failing to start.
pub fn build_from_config(config: &AppConfig) -> Option<Arc<dyn Provider>> {
    let Some(api_key) = config.provider_api_key() else {
        tracing::warn!(
            provider = %config.default_provider,
            "No API key configured (set GEMINI_API_KEY); AI commands will fail"
        );
        return None;
    };

    if config.default_provider != "gemini" {
        tracing::warn!(
            provider = %config.default_provider,
            "Unknown provider, using the Gemini API"
        );
    }

    let mut provider = GeminiProvider::new(api_key);
    if let Some(url) = config.provider_api_url() {
        provider = provider.with_base_url(url);
    }
    Some(Arc::new(provider))
}
