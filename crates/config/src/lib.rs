//! Configuration loading, validation, and management for QR Nexus.
//!
//! Loads configuration from `~/.qr-nexus/config.toml` with environment
//! variable overrides. Validates all settings at startup; the result is
//! read-only for the lifetime of the process.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.qr-nexus/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the generation provider (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Passphrase the QR generator used to encrypt payloads.
    /// Unset means every payload is decoded as plain base64.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_passphrase: Option<String>,

    /// Default generation provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Command dispatch configuration
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-pro".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("encryption_passphrase", &redact(&self.encryption_passphrase))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("providers", &self.providers)
            .field("gateway", &self.gateway)
            .field("dispatch", &self.dispatch)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Request body limit. The proxy only takes query parameters, so this
    /// stays small.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    8888
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_body_bytes() -> usize {
    16 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Reject `product-info` commands without a `productId` instead of
    /// rendering the literal `undefined` into the prompt.
    #[serde(default)]
    pub strict_parameters: bool,
}

impl AppConfig {
    /// Load configuration from the default path (~/.qr-nexus/config.toml).
    ///
    /// Environment variables override the file:
    /// - `NEXUS_API_KEY`, then `GEMINI_API_KEY`
    /// - `NEXUS_ENCRYPTION_PASSPHRASE`, then `ENCRYPTION_PASSPHRASE`
    /// - `NEXUS_PROVIDER`, `NEXUS_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// Secrets from the environment win over the file. Empty values are
    /// treated as unset.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(key) = non_empty("NEXUS_API_KEY").or_else(|| non_empty("GEMINI_API_KEY")) {
            self.api_key = Some(key);
        }

        if let Some(passphrase) = non_empty("NEXUS_ENCRYPTION_PASSPHRASE")
            .or_else(|| non_empty("ENCRYPTION_PASSPHRASE"))
        {
            self.encryption_passphrase = Some(passphrase);
        }

        if let Some(provider) = non_empty("NEXUS_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = non_empty("NEXUS_MODEL") {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".qr-nexus")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.port must be non-zero".into(),
            ));
        }

        if self
            .encryption_passphrase
            .as_deref()
            .is_some_and(str::is_empty)
        {
            return Err(ConfigError::ValidationError(
                "encryption_passphrase must not be empty; remove it to disable decryption".into(),
            ));
        }

        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_model must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// API key for the default provider: per-provider entry first, then the
    /// global key.
    pub fn provider_api_key(&self) -> Option<String> {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
            .filter(|k| !k.is_empty())
    }

    /// Base URL override for the default provider.
    pub fn provider_api_url(&self) -> Option<String> {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.api_url.clone())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.provider_api_key().is_some()
    }

    /// Check if payload decryption is enabled.
    pub fn has_passphrase(&self) -> bool {
        self.encryption_passphrase.is_some()
    }

    /// A copy with every secret removed, safe to print.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        let mask = |s: &mut Option<String>| {
            if s.is_some() {
                *s = Some("[REDACTED]".into());
            }
        };
        mask(&mut config.api_key);
        mask(&mut config.encryption_passphrase);
        for provider in config.providers.values_mut() {
            mask(&mut provider.api_key);
        }
        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            encryption_passphrase: None,
            default_provider: default_provider(),
            default_model: default_model(),
            providers: HashMap::new(),
            gateway: GatewayConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
