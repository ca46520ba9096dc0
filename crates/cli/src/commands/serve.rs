//! `nexus serve`: Start the HTTP proxy.

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
        config.validate()?;
    }

    println!("QR Nexus proxy");
    println!("   Listening:  {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:   {} ({})", config.default_provider, config.default_model);
    println!("   API key:    {}", if config.has_api_key() { "set" } else { "missing" });
    println!("   Decryption: {}", if config.has_passphrase() { "enabled" } else { "disabled" });

    nexus_gateway::start(config).await?;

    Ok(())
}
