pub mod router;
pub mod state;

use std::sync::Arc;

use tokio::sync::watch;

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::relay::Relay;
use crate::startup::{self, SurfaceKind};

/// Start the HTTP server with the given configuration.
///
/// The listener is bound right away; the surface is launched and logged in
/// in the background, and requests get 503 until that finishes. On Ctrl-C a
/// bootstrap still waiting for login is told to stop and awaited, so any
/// browser it launched is closed.
pub async fn start(config: RelayConfig, surface: SurfaceKind) -> Result<()> {
    std::fs::create_dir_all(&config.data_dir)?;

    let bind_addr = config.bind_address();
    let app_state = state::AppState::new(Arc::new(config));
    let app = router::build(app_state.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| RelayError::Server(format!("Failed to bind to {bind_addr}: {e}")))?;

    tracing::info!("Server listening on {bind_addr}");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let bootstrap = tokio::spawn(bootstrap(app_state.clone(), surface, shutdown_rx));

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .map_err(|e| RelayError::Server(format!("Server error: {e}")))?;

    tracing::info!("Shutting down...");
    shutdown_tx.send(true).ok();
    if let Err(e) = bootstrap.await {
        tracing::warn!(error = %e, "Bootstrap task failed");
    }
    if let Some(relay) = app_state.relay() {
        relay.shutdown().await;
    }

    Ok(())
}

async fn bootstrap(state: state::AppState, kind: SurfaceKind, shutdown: watch::Receiver<bool>) {
    match startup::launch_surface(&state.config, kind, shutdown).await {
        Ok(surface) => {
            let name = surface.name().to_string();
            let relay = Arc::new(Relay::new(surface, &state.config));
            if state.set_relay(relay) {
                tracing::info!(surface = %name, "Relay ready");
            }
        }
        Err(RelayError::Cancelled) => {
            tracing::info!("Startup cancelled by shutdown");
        }
        Err(e) => {
            tracing::error!(error = %e, "Startup failed, service stays initializing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(dir: &tempfile::TempDir) -> Arc<RelayConfig> {
        Arc::new(RelayConfig {
            data_dir: dir.path().to_path_buf(),
            ..RelayConfig::default()
        })
    }

    #[tokio::test]
    async fn test_bootstrap_publishes_relay() {
        let dir = tempfile::tempdir().unwrap();
        let state = state::AppState::new(temp_config(&dir));
        let (_tx, rx) = watch::channel(false);

        bootstrap(state.clone(), SurfaceKind::Memory, rx).await;
        assert!(state.is_ready());
    }

    #[tokio::test]
    async fn test_cancelled_bootstrap_launches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let state = state::AppState::new(temp_config(&dir));
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        bootstrap(state.clone(), SurfaceKind::Webdriver, rx).await;
        assert!(!state.is_ready());
    }
}
