use crate::config::RelayConfig;
use crate::dirs;
use crate::error::Result;

/// Render the effective configuration as TOML.
pub fn render(config: &RelayConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

/// Execute the `config` command: print the effective configuration.
pub fn execute(config: &RelayConfig) -> Result<()> {
    println!("# {}", dirs::config_path().display());
    print!("{}", render(config)?);
    Ok(())
}
