use crate::config::RelayConfig;
use crate::error::Result;
use crate::startup::LoginMarker;

/// Execute the `reset` command: delete the saved-login marker.
pub fn execute(config: &RelayConfig) -> Result<()> {
    let marker = LoginMarker::from_config(config);
    if marker.clear()? {
        println!("Login reset. The next start opens a browser window to sign in.");
    } else {
        println!("No saved login at {}", marker.path().display());
    }
    Ok(())
}
