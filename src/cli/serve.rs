use crate::config::RelayConfig;
use crate::error::Result;
use crate::server;
use crate::startup::SurfaceKind;

/// Apply command-line overrides on top of the loaded configuration.
pub fn apply_overrides(
    config: &mut RelayConfig,
    host: Option<&str>,
    port: Option<u16>,
    webdriver_url: Option<&str>,
) {
    if let Some(host) = host {
        config.host = host.to_string();
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(url) = webdriver_url {
        config.webdriver_url = url.to_string();
    }
}

/// Execute the `serve` command: start the HTTP server.
pub async fn execute(
    host: Option<&str>,
    port: Option<u16>,
    webdriver_url: Option<&str>,
    surface: SurfaceKind,
) -> Result<()> {
    let mut config = RelayConfig::load()?;
    apply_overrides(&mut config, host, port, webdriver_url);

    println!("A3S Relay server starting...");
    println!("Listening on http://{}:{}", config.host, config.port);
    println!("Press Ctrl+C to stop");

    server::start(config, surface).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_only_touch_given_fields() {
        let mut config = RelayConfig::default();
        apply_overrides(&mut config, None, Some(9090), Some("http://localhost:4444"));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9090);
        assert_eq!(config.webdriver_url, "http://localhost:4444");
    }
}
