//! Startup and login
//!
//! The agent front-end requires a signed-in browser profile. The first run
//! opens a visible browser and waits for the user to sign in; success is
//! recorded in a marker file and the browser is relaunched headless. Later
//! runs verify the saved login once and refuse to become ready when it has
//! expired. Shutdown during any of this closes whatever browser was launched.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::surface::memory::MemorySurface;
use crate::surface::webdriver::{WebDriverOptions, WebDriverSurface};
use crate::surface::{AgentSurface, PageId};

/// Which surface implementation backs the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SurfaceKind {
    /// Real browser over WebDriver
    Webdriver,
    /// Offline echo surface
    Memory,
}

/// Marker file recording a completed login.
#[derive(Debug, Clone)]
pub struct LoginMarker {
    path: PathBuf,
}

impl LoginMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.login_marker_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn mark(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, "ok")?;
        Ok(())
    }

    /// Remove the marker; `false` if there was none.
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// How the login check concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A saved login is still valid
    Ready,
    /// The user just signed in; the marker has been written
    LoggedIn,
}

/// Time allowed for a first-time login.
#[derive(Debug, Clone)]
pub struct LoginTiming {
    pub wait: Duration,
    pub poll: Duration,
}

impl From<&RelayConfig> for LoginTiming {
    fn from(config: &RelayConfig) -> Self {
        Self {
            wait: config.login_wait(),
            poll: config.login_poll(),
        }
    }
}

/// Check the login state of `surface` on a scratch page.
pub async fn verify_login(
    surface: &dyn AgentSurface,
    marker: &LoginMarker,
    timing: &LoginTiming,
) -> Result<LoginOutcome> {
    let page = surface.new_page().await?;
    let outcome = verify_on_page(surface, &page, marker, timing).await;
    if let Err(e) = surface.close(&page).await {
        tracing::debug!(error = %e, "Failed to close login page");
    }
    outcome
}

async fn verify_on_page(
    surface: &dyn AgentSurface,
    page: &PageId,
    marker: &LoginMarker,
    timing: &LoginTiming,
) -> Result<LoginOutcome> {
    surface.navigate(page).await?;

    if marker.exists() {
        if surface.probe_authenticated(page).await? {
            return Ok(LoginOutcome::Ready);
        }
        marker.clear()?;
        tracing::warn!(marker = %marker.path().display(), "Saved login expired, marker cleared");
        return Err(RelayError::AuthExpired);
    }

    tracing::info!(
        wait_secs = timing.wait.as_secs(),
        "No saved login, sign in through the browser window"
    );
    let started = Instant::now();
    let deadline = started + timing.wait;
    let mut checks: u32 = 0;

    loop {
        if surface.probe_authenticated(page).await? {
            marker.mark()?;
            tracing::info!("Login saved");
            return Ok(LoginOutcome::LoggedIn);
        }
        if Instant::now() >= deadline {
            return Err(RelayError::LoginTimeout(timing.wait));
        }

        checks += 1;
        if checks % 15 == 0 {
            tracing::info!(
                elapsed_secs = started.elapsed().as_secs(),
                "Still waiting for login"
            );
        }
        tokio::time::sleep(timing.poll).await;
    }
}

/// Launch the configured surface and make sure it is signed in.
///
/// Flipping `shutdown` to `true` abandons the login wait; a browser launched
/// so far is shut down and `RelayError::Cancelled` is returned.
pub async fn launch_surface(
    config: &RelayConfig,
    kind: SurfaceKind,
    mut shutdown: watch::Receiver<bool>,
) -> Result<Arc<dyn AgentSurface>> {
    match kind {
        SurfaceKind::Memory => {
            tracing::info!("Using offline memory surface");
            Ok(Arc::new(MemorySurface::echo()))
        }
        SurfaceKind::Webdriver => {
            let marker = LoginMarker::from_config(config);
            let timing = LoginTiming::from(config);
            let first_time = !marker.exists();

            let surface =
                launch_verified(config, &marker, &timing, !first_time, &mut shutdown).await?;
            match surface {
                (surface, LoginOutcome::Ready) => Ok(surface),
                (visible, LoginOutcome::LoggedIn) => {
                    shutdown_quietly(visible.as_ref()).await;
                    tracing::info!("Relaunching headless");
                    let (surface, _) =
                        launch_verified(config, &marker, &timing, true, &mut shutdown).await?;
                    Ok(surface)
                }
            }
        }
    }
}

async fn launch_verified(
    config: &RelayConfig,
    marker: &LoginMarker,
    timing: &LoginTiming,
    headless: bool,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(Arc<dyn AgentSurface>, LoginOutcome)> {
    if *shutdown.borrow() {
        return Err(RelayError::Cancelled);
    }

    let surface: Arc<dyn AgentSurface> =
        Arc::new(WebDriverSurface::launch(WebDriverOptions::from_config(config, headless)).await?);
    verify_until_cancelled(surface, marker, timing, shutdown).await
}

/// `verify_login` raced against `shutdown`. On failure or cancellation the
/// surface is shut down before returning.
async fn verify_until_cancelled(
    surface: Arc<dyn AgentSurface>,
    marker: &LoginMarker,
    timing: &LoginTiming,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(Arc<dyn AgentSurface>, LoginOutcome)> {
    let verified = tokio::select! {
        outcome = verify_login(surface.as_ref(), marker, timing) => outcome,
        _ = cancelled(shutdown) => Err(RelayError::Cancelled),
    };

    match verified {
        Ok(outcome) => Ok((surface, outcome)),
        Err(e) => {
            shutdown_quietly(surface.as_ref()).await;
            Err(e)
        }
    }
}

/// Resolves once `shutdown` is `true`. A dropped sender never cancels.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn shutdown_quietly(surface: &dyn AgentSurface) {
    if let Err(e) = surface.shutdown().await {
        tracing::debug!(surface = surface.name(), error = %e, "Surface shutdown failed");
    }
}
