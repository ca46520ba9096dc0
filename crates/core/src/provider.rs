//! Provider trait: the abstraction over text-generation backends.
//!
//! The dispatcher renders a [`PromptSpec`]; a Provider turns it into text.
//! The proxy never generates text itself.
//!
//! Implementations: Gemini (Generative Language API).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// A rendered prompt and the model it is meant for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSpec {
    /// The model to use (e.g., "gemini-pro")
    pub model: String,

    /// The rendered prompt text
    pub prompt: String,
}

impl PromptSpec {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
        }
    }
}

/// The core Provider trait.
///
/// The gateway calls `generate()` without knowing which backend is behind
/// it, so tests can swap in a canned responder.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini").
    fn name(&self) -> &str;

    /// Generate a text response for the prompt.
    async fn generate(&self, spec: &PromptSpec) -> std::result::Result<String, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
