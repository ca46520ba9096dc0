//! `nexus config`: Configuration management commands.

use nexus_config::AppConfig;

/// Problems that don't stop the proxy from starting but will break scans.
pub fn warnings(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();

    if !config.has_api_key() {
        warnings.push("No API key set (set GEMINI_API_KEY); every AI command will fail");
    }

    if !config.has_passphrase() {
        warnings.push("No encryption passphrase set; encrypted QR codes cannot be read");
    }

    if config.default_provider != "gemini" {
        warnings.push("Only the gemini provider is supported");
    }

    if config.gateway.host == "0.0.0.0" {
        warnings.push("Gateway bound to 0.0.0.0; the proxy has no caller authentication");
    }

    warnings
}

pub fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   Config parsed successfully");

            let warnings = warnings(&config);
            if warnings.is_empty() {
                println!("   All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   warning: {w}");
                }
            }

            println!();
            println!("   Provider:   {}", config.default_provider);
            println!("   Model:      {}", config.default_model);
            println!(
                "   Gateway:    {}:{}",
                config.gateway.host, config.gateway.port
            );
            println!(
                "   Strict:     {}",
                config.dispatch.strict_parameters
            );
        }
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let toml_str = toml::to_string_pretty(&config.redacted())?;
    println!("{toml_str}");
    Ok(())
}

pub fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
