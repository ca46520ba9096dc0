//! `nexus inspect`: Decode a transport string offline.

use nexus_core::{DispatchError, PayloadError, PromptSpec};
use nexus_dispatch::CommandDispatcher;
use nexus_security::{Decoded, PayloadCodec};

/// What the proxy would do with one transport string, short of calling the
/// provider.
pub struct Inspection {
    pub decoded: Decoded,
    pub prompt: Result<PromptSpec, DispatchError>,
}

pub fn inspect(
    transport: &str,
    codec: &PayloadCodec,
    dispatcher: &CommandDispatcher,
) -> Result<Inspection, PayloadError> {
    let decoded = codec.decode(transport)?;
    let prompt = dispatcher.dispatch(&decoded.command);
    Ok(Inspection { decoded, prompt })
}

pub fn run(transport: &str, passphrase: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let passphrase = super::pick_passphrase(passphrase, config.encryption_passphrase.as_deref());
    let codec = PayloadCodec::new(passphrase.as_deref());
    let dispatcher = CommandDispatcher::from_config(&config);

    let inspection = inspect(transport, &codec, &dispatcher)?;

    println!("Decode path: {:?}", inspection.decoded.path);
    println!("Command:");
    println!("{}", serde_json::to_string_pretty(&inspection.decoded.command)?);
    println!();

    let spec = inspection.prompt?;
    println!("Model:  {}", spec.model);
    println!("Prompt: {}", spec.prompt);
    Ok(())
}
