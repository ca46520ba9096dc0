//! Command dispatch for QR Nexus.
//!
//! Maps a [`DecodedCommand`] onto one of a closed set of [`CommandKind`]s and
//! renders its prompt. Dispatch is a pure function of the command and the
//! dispatcher's configuration: no I/O, no clock, no randomness.
//!
//! Adding a command kind means adding a variant here and a template in
//! [`templates`]; the exhaustive `match` in [`CommandDispatcher::dispatch`]
//! points at anything left out.

pub mod templates;

use nexus_config::{AppConfig, DispatchConfig};
use nexus_core::{DecodedCommand, DispatchError, PromptSpec};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};

/// The command kinds a QR code can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    ContextualSearch,
    LocationAssistant,
    ProductInfo,
    CustomerSupport,
}

impl CommandKind {
    pub const ALL: [CommandKind; 4] = [
        Self::ContextualSearch,
        Self::LocationAssistant,
        Self::ProductInfo,
        Self::CustomerSupport,
    ];

    /// The wire name, as carried in `cmd`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContextualSearch => "contextual-search",
            Self::LocationAssistant => "location-assistant",
            Self::ProductInfo => "product-info",
            Self::CustomerSupport => "customer-support",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = DispatchError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| DispatchError::UnknownCommand(name.to_string()))
    }
}

/// Selects and renders the prompt template for a command.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    model: String,
    config: DispatchConfig,
}

impl CommandDispatcher {
    pub fn new(model: impl Into<String>, config: DispatchConfig) -> Self {
        Self {
            model: model.into(),
            config,
        }
    }

    /// Build a dispatcher for the configured default model.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.default_model, config.dispatch.clone())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Render the prompt for `cmd`.
    pub fn dispatch(&self, cmd: &DecodedCommand) -> Result<PromptSpec, DispatchError> {
        let kind: CommandKind = cmd.command.parse()?;

        let prompt = match kind {
            CommandKind::ContextualSearch => templates::contextual_search(cmd),
            CommandKind::LocationAssistant => templates::location_assistant(cmd),
            CommandKind::ProductInfo => {
                if cmd.param_value("productId").is_none() {
                    if self.config.strict_parameters {
                        return Err(DispatchError::MissingParameter {
                            command: kind.to_string(),
                            parameter: "productId".into(),
                        });
                    }
                    warn!(command = %kind, "productId missing, prompt will reference \"undefined\"");
                }
                templates::product_info(cmd)
            }
            CommandKind::CustomerSupport => templates::customer_support(cmd),
        };

        debug!(command = %kind, model = %self.model, prompt_len = prompt.len(), "Prompt rendered");
        Ok(PromptSpec::new(&self.model, prompt))
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
