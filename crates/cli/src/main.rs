//! QR Nexus CLI: the main entry point.
//!
//! Commands:
//! - `serve`    Start the HTTP proxy
//! - `seal`     Build a transport string (or QR URL) from command JSON
//! - `inspect`  Decode a transport string and show the rendered prompt
//! - `config`   Show, locate or validate configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "nexus",
    about = "QR Nexus: turns scanned QR codes into AI answers",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP proxy server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Encode (and optionally encrypt) a command for a QR code
    Seal {
        /// Command JSON, e.g. '{"cmd":"contextual-search","prm":{"intent":"pizza"}}'
        #[arg(short = 'j', long)]
        payload: String,

        /// Passphrase to encrypt with (defaults to the configured one)
        #[arg(short, long, env = "NEXUS_ENCRYPTION_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,

        /// Print a full URL with the transport in `nexus_ai`
        #[arg(short, long)]
        base_url: Option<String>,
    },

    /// Decode a transport string offline and render its prompt
    Inspect {
        /// The `nexus_ai` value from a QR code
        transport: String,

        /// Passphrase to decrypt with (defaults to the configured one)
        #[arg(short, long, env = "NEXUS_ENCRYPTION_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration with secrets redacted
    Show,
    /// Print the config file path
    Path,
    /// Validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Seal {
            payload,
            passphrase,
            base_url,
        } => commands::seal::run(&payload, passphrase, base_url.as_deref())?,
        Commands::Inspect {
            transport,
            passphrase,
        } => commands::inspect::run(&transport, passphrase)?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show()?,
            ConfigAction::Path => commands::config_cmd::path()?,
            ConfigAction::Validate => commands::config_cmd::validate()?,
        },
    }

    Ok(())
}
