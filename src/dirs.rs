use std::path::PathBuf;

/// Returns the base directory for relay data.
///
/// Uses `$A3S_RELAY_HOME` if set, otherwise defaults to `~/.a3s/relay`.
pub fn relay_home() -> PathBuf {
    if let Ok(home) = std::env::var("A3S_RELAY_HOME") {
        return PathBuf::from(home);
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".a3s")
        .join("relay")
}

/// Returns the persistent browser profile directory.
pub fn profile_dir() -> PathBuf {
    relay_home().join("chrome-profile")
}

/// Returns the path of the marker file written after a successful login.
pub fn login_marker_path() -> PathBuf {
    relay_home().join("logged-in")
}

/// Returns the path to the user configuration file.
pub fn config_path() -> PathBuf {
    relay_home().join("config.toml")
}

/// Ensure all required directories exist.
pub fn ensure_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(relay_home())?;
    std::fs::create_dir_all(profile_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process state; keep them in one test to avoid races.
    #[test]
    fn test_paths_follow_relay_home() {
        std::env::remove_var("A3S_RELAY_HOME");
        let home = relay_home();
        assert!(home.ends_with(".a3s/relay") || home.ends_with(".a3s\\relay"));

        std::env::set_var("A3S_RELAY_HOME", "/tmp/test-relay");
        assert_eq!(relay_home(), PathBuf::from("/tmp/test-relay"));
        assert_eq!(profile_dir(), PathBuf::from("/tmp/test-relay/chrome-profile"));
        assert_eq!(login_marker_path(), PathBuf::from("/tmp/test-relay/logged-in"));
        assert_eq!(config_path(), PathBuf::from("/tmp/test-relay/config.toml"));
        std::env::remove_var("A3S_RELAY_HOME");
    }
}
