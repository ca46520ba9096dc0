pub mod config_cmd;
pub mod inspect;
pub mod seal;
pub mod serve;

use nexus_config::AppConfig;

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load().map_err(|e| format!("Failed to load config: {e}").into())
}

/// An explicit passphrase wins over the configured one. An explicit empty
/// passphrase forces plain encoding.
pub(crate) fn pick_passphrase(explicit: Option<String>, configured: Option<&str>) -> Option<String> {
    match explicit {
        Some(p) if p.is_empty() => None,
        Some(p) => Some(p),
        None => configured.map(String::from),
    }
}
