use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dirs;
use crate::error::{RelayError, Result};

/// User-configurable settings for the relay server and CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Host address for the HTTP server (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the HTTP server (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base directory for the browser profile and login marker
    #[serde(default = "dirs::relay_home")]
    pub data_dir: PathBuf,

    /// WebDriver endpoint (chromedriver) used to drive the browser
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Entry point of the agent front-end
    #[serde(default = "default_agent_url")]
    pub agent_url: String,

    /// Optional browser binary passed to the driver
    #[serde(default)]
    pub browser_binary: Option<String>,

    /// Model name reported when a request does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Model identifiers advertised by `GET /v1/models`
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// `owned_by` field of the advertised models
    #[serde(default = "default_owned_by")]
    pub owned_by: String,

    /// Per-turn response timeout unless the request overrides it
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,

    /// Interval between output samples while waiting for a response
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Consecutive unchanged samples required before output counts as settled
    #[serde(default = "default_stable_samples")]
    pub stable_samples: u32,

    /// Bounded wait for the input box of a new session page
    #[serde(default = "default_input_ready_timeout_secs")]
    pub input_ready_timeout_secs: u64,

    /// How long a first-time login may take
    #[serde(default = "default_login_wait_secs")]
    pub login_wait_secs: u64,

    /// Interval between login probes during first-time login
    #[serde(default = "default_login_poll_secs")]
    pub login_poll_secs: u64,

    /// Delay before probing a freshly loaded page for the input box
    #[serde(default = "default_auth_probe_delay_ms")]
    pub auth_probe_delay_ms: u64,

    /// DOM selectors of the agent front-end
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// CSS selectors locating the affordances of the agent front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_input_selector")]
    pub input: String,
    #[serde(default = "default_editor_selector")]
    pub editor: String,
    #[serde(default = "default_send_button_selector")]
    pub send_button: String,
    #[serde(default = "default_new_chat_selector")]
    pub new_chat: String,
    #[serde(default = "default_response_unit_selector")]
    pub response_unit: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_webdriver_url() -> String {
    "http://127.0.0.1:9515".to_string()
}

fn default_agent_url() -> String {
    "https://gemini.google.com/app".to_string()
}

fn default_model() -> String {
    "gemini-web".to_string()
}

fn default_models() -> Vec<String> {
    ["gemini-web", "gemini-pro", "gpt-4", "gpt-4o"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_owned_by() -> String {
    "google".to_string()
}

fn default_response_timeout_secs() -> u64 {
    300
}

fn default_poll_interval_ms() -> u64 {
    300
}

fn default_stable_samples() -> u32 {
    2
}

fn default_input_ready_timeout_secs() -> u64 {
    15
}

fn default_login_wait_secs() -> u64 {
    300
}

fn default_login_poll_secs() -> u64 {
    2
}

fn default_auth_probe_delay_ms() -> u64 {
    3000
}

fn default_input_selector() -> String {
    "rich-textarea".to_string()
}

fn default_editor_selector() -> String {
    "rich-textarea .ql-editor".to_string()
}

fn default_send_button_selector() -> String {
    r#"button[aria-label="Send message"]"#.to_string()
}

fn default_new_chat_selector() -> String {
    r#"side-nav-action-button[data-test-id="new-chat-button"]"#.to_string()
}

fn default_response_unit_selector() -> String {
    r#"div[id^="model-response-message-content"]"#.to_string()
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            input: default_input_selector(),
            editor: default_editor_selector(),
            send_button: default_send_button_selector(),
            new_chat: default_new_chat_selector(),
            response_unit: default_response_unit_selector(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: dirs::relay_home(),
            webdriver_url: default_webdriver_url(),
            agent_url: default_agent_url(),
            browser_binary: None,
            default_model: default_model(),
            models: default_models(),
            owned_by: default_owned_by(),
            response_timeout_secs: default_response_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            stable_samples: default_stable_samples(),
            input_ready_timeout_secs: default_input_ready_timeout_secs(),
            login_wait_secs: default_login_wait_secs(),
            login_poll_secs: default_login_poll_secs(),
            auth_probe_delay_ms: default_auth_probe_delay_ms(),
            selectors: SelectorConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from the default config file path.
    /// Returns default config if the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&dirs::config_path())
    }

    /// Load configuration from an explicit path, defaulting when absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: RelayConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save the current configuration to the default config file path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&dirs::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the server bind address string (e.g., "127.0.0.1:8080").
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn profile_dir(&self) -> PathBuf {
        self.data_dir.join("chrome-profile")
    }

    pub fn login_marker_path(&self) -> PathBuf {
        self.data_dir.join("logged-in")
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn input_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.input_ready_timeout_secs)
    }

    pub fn login_wait(&self) -> Duration {
        Duration::from_secs(self.login_wait_secs)
    }

    pub fn login_poll(&self) -> Duration {
        Duration::from_secs(self.login_poll_secs)
    }

    pub fn auth_probe_delay(&self) -> Duration {
        Duration::from_millis(self.auth_probe_delay_ms)
    }
}
