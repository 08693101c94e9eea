pub mod config;
pub mod reset;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::startup::SurfaceKind;

/// A3S Relay - OpenAI-compatible API in front of a browser-driven agent
#[derive(Debug, Parser)]
#[command(name = "a3s-relay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host address to bind to (defaults to the config file value)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to the config file value)
        #[arg(long)]
        port: Option<u16>,

        /// WebDriver endpoint, e.g. http://127.0.0.1:9515
        #[arg(long)]
        webdriver_url: Option<String>,

        /// Agent surface to drive
        #[arg(long, value_enum, default_value_t = SurfaceKind::Webdriver)]
        surface: SurfaceKind,
    },

    /// Forget the saved login so the next start signs in again
    Reset,

    /// Print the effective configuration as TOML
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from([
            "a3s-relay",
            "serve",
            "--port",
            "9000",
            "--surface",
            "memory",
        ]);
        match cli.command {
            Commands::Serve {
                host,
                port,
                webdriver_url,
                surface,
            } => {
                assert!(host.is_none());
                assert_eq!(port, Some(9000));
                assert!(webdriver_url.is_none());
                assert_eq!(surface, SurfaceKind::Memory);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_serve_defaults_to_webdriver() {
        let cli = Cli::parse_from(["a3s-relay", "serve"]);
        assert!(matches!(
            cli.command,
            Commands::Serve {
                surface: SurfaceKind::Webdriver,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_reset_and_config() {
        assert!(matches!(
            Cli::parse_from(["a3s-relay", "reset"]).command,
            Commands::Reset
        ));
        assert!(matches!(
            Cli::parse_from(["a3s-relay", "config"]).command,
            Commands::Config
        ));
    }
}
