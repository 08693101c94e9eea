use clap::Parser;
use tracing_subscriber::EnvFilter;

use a3s_relay::cli::{Cli, Commands};
use a3s_relay::config::RelayConfig;
use a3s_relay::dirs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Ensure storage directories exist
    dirs::ensure_dirs()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            webdriver_url,
            surface,
        } => {
            a3s_relay::cli::serve::execute(
                host.as_deref(),
                port,
                webdriver_url.as_deref(),
                surface,
            )
            .await?;
        }
        Commands::Reset => {
            a3s_relay::cli::reset::execute(&RelayConfig::load()?)?;
        }
        Commands::Config => {
            a3s_relay::cli::config::execute(&RelayConfig::load()?)?;
        }
    }

    Ok(())
}
