use anyhow::Result;
use clap::{Parser, Subcommand};
use duoscribe::{client, relay, Config};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "duoscribe", about = "Dual-provider live transcription relay")]
struct Cli {
    /// Configuration file (without extension)
    #[arg(long, default_value = "config/duoscribe")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay server
    Serve,
    /// Capture the microphone and stream to both providers via the relay
    Capture {
        /// Meeting context used to steer curation
        #[arg(long, default_value = "")]
        context: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    info!("duoscribe v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve => relay::serve(config).await,
        Command::Capture { context } => client::run(config, context).await,
    }
}
