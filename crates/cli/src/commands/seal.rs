//! `nexus seal`: Build the transport string a QR code carries.

use nexus_core::{DecodedCommand, PayloadError};
use nexus_dispatch::CommandKind;
use nexus_security::PayloadCodec;

pub fn run(
    payload: &str,
    passphrase: Option<String>,
    base_url: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let passphrase = match passphrase {
        Some(p) => super::pick_passphrase(Some(p), None),
        None => super::load_config()?.encryption_passphrase,
    };

    let transport = seal_transport(payload, passphrase.as_deref())?;
    if passphrase.is_none() {
        tracing::info!("No passphrase; payload is plain base64");
    }

    match base_url {
        Some(base) => println!("{}", qr_url(base, &transport)),
        None => println!("{transport}"),
    }
    Ok(())
}

/// Parse command JSON and encode it, encrypting when a passphrase is given.
pub fn seal_transport(payload: &str, passphrase: Option<&str>) -> Result<String, PayloadError> {
    let command = DecodedCommand::from_json(payload)?;
    if command.command.parse::<CommandKind>().is_err() {
        tracing::warn!(command = %command.command, "Sealing a command the proxy does not know");
    }
    PayloadCodec::new(passphrase).seal(&command)
}

/// Append the transport to `base_url` as the `nexus_ai` query parameter.
///
/// The transport is URL-safe base64 without padding, so it needs no escaping.
pub fn qr_url(base_url: &str, transport: &str) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}nexus_ai={transport}")
}
