//! W3C WebDriver surface
//!
//! Drives the agent's web front-end in a real browser through a WebDriver
//! endpoint (chromedriver). One browser session is opened per process with a
//! persistent profile so that the login survives restarts; every agent session
//! lives in its own tab.
//!
//! WebDriver has a single focused window per browser session, so all commands
//! go through one driver lock that also remembers which tab has focus.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{Mutex, MutexGuard};

use super::{AgentSurface, PageId, ResponseUnit};
use crate::config::{RelayConfig, SelectorConfig};
use crate::error::{RelayError, Result};
use crate::types::CodeSegment;

const ENTER_KEY: &str = "\u{E007}";
const INPUT_POLL: Duration = Duration::from_millis(250);
const SEND_BUTTON_WAIT: Duration = Duration::from_secs(3);
const RESET_SETTLE: Duration = Duration::from_secs(1);

const PRESENT_JS: &str = "return document.querySelector(arguments[0]) !== null;";

const CLICK_JS: &str = r#"
const el = document.querySelector(arguments[0]);
if (!el) return false;
el.click();
return true;
"#;

const INSERT_JS: &str = r#"
const el = document.querySelector(arguments[0]);
if (!el) return false;
el.click();
el.focus();
document.execCommand('selectAll', false, null);
document.execCommand('delete', false, null);
document.execCommand('insertText', false, arguments[1]);
return true;
"#;

const COUNT_JS: &str = "return document.querySelectorAll(arguments[0]).length;";

// Code blocks are rendered as custom `code-block` elements; the clone swaps
// them for `<pre><code class="language-x">` so Markdown conversion sees
// ordinary fenced code.
const READ_JS: &str = r#"
const unit = document.querySelectorAll(arguments[0])[arguments[1]];
if (!unit) return null;
const langOf = (el) => {
  const host = el.closest('code-block') || el.closest('pre') || el;
  const classes = [...el.classList, ...host.classList];
  const cls = classes.find((c) => c.startsWith('language-'));
  if (cls) return cls.slice('language-'.length);
  const label = host.querySelector('.code-block-decoration span, .code-block-decoration');
  const name = label ? label.textContent.trim().toLowerCase() : '';
  return name || null;
};
const selectors = ['code-block code', 'code-block', 'pre code', 'pre',
  '.code-container code', '[class*="code"] pre', 'code[class*="language"]'];
let code = [];
for (const sel of selectors) {
  const els = unit.querySelectorAll(sel);
  if (els.length > 0) {
    code = [...els].map((el) => ({ language: langOf(el), code: el.innerText || el.textContent || '' }));
    break;
  }
}
const clone = unit.cloneNode(true);
clone.querySelectorAll('code-block').forEach((block) => {
  const pre = document.createElement('pre');
  const inner = document.createElement('code');
  const lang = langOf(block);
  if (lang) inner.className = 'language-' + lang;
  const src = block.querySelector('code');
  inner.textContent = src ? src.textContent : block.textContent;
  pre.appendChild(inner);
  block.replaceWith(pre);
});
return { markup: clone.innerHTML, text: unit.innerText || unit.textContent || '', code };
"#;

/// Settings for launching the browser session.
#[derive(Debug, Clone)]
pub struct WebDriverOptions {
    /// WebDriver endpoint, e.g. `http://127.0.0.1:9515`
    pub endpoint: String,
    pub agent_url: String,
    pub profile_dir: PathBuf,
    pub browser_binary: Option<String>,
    pub headless: bool,
    pub selectors: SelectorConfig,
    pub auth_probe_delay: Duration,
}

impl WebDriverOptions {
    pub fn from_config(config: &RelayConfig, headless: bool) -> Self {
        Self {
            endpoint: config.webdriver_url.trim_end_matches('/').to_string(),
            agent_url: config.agent_url.clone(),
            profile_dir: config.profile_dir(),
            browser_binary: config.browser_binary.clone(),
            headless,
            selectors: config.selectors.clone(),
            auth_probe_delay: config.auth_probe_delay(),
        }
    }

    /// New-session capabilities for chromedriver.
    pub fn capabilities(&self) -> Value {
        let mut args = vec![
            format!("--user-data-dir={}", self.profile_dir.display()),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--disable-extensions".to_string(),
            "--window-size=1280,900".to_string(),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }

        let mut chrome = json!({ "args": args });
        if let Some(binary) = &self.browser_binary {
            chrome["binary"] = Value::String(binary.clone());
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": chrome,
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct NewWindow {
    handle: String,
}

#[derive(Debug, Deserialize)]
struct RawUnit {
    #[serde(default)]
    markup: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    code: Vec<CodeSegment>,
}

/// Unwrap the `value` member of a WebDriver reply, mapping error payloads.
fn decode_reply(success: bool, payload: Value) -> Result<Value> {
    let value = match payload {
        Value::Object(mut map) => map.remove("value").unwrap_or(Value::Null),
        other => other,
    };

    if let Some(kind) = value.get("error").and_then(Value::as_str) {
        return Err(RelayError::WebDriver {
            kind: kind.to_string(),
            message: value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
        });
    }

    if !success {
        return Err(RelayError::WebDriver {
            kind: "unknown error".to_string(),
            message: value.to_string(),
        });
    }

    Ok(value)
}

/// Browser-backed `AgentSurface`.
pub struct WebDriverSurface {
    http: reqwest::Client,
    session_url: String,
    options: WebDriverOptions,
    /// Driver lock; holds the handle of the focused tab.
    focus: Mutex<Option<String>>,
}

impl WebDriverSurface {
    /// Start a browser session on the configured endpoint.
    pub async fn launch(options: WebDriverOptions) -> Result<Self> {
        std::fs::create_dir_all(&options.profile_dir)?;

        let http = reqwest::Client::builder()
            .user_agent("a3s-relay/0.1")
            .build()?;

        let url = format!("{}/session", options.endpoint);
        let response = http.post(&url).json(&options.capabilities()).send().await?;
        let success = response.status().is_success();
        let created: NewSession = serde_json::from_value(decode_reply(success, response.json().await?)?)?;

        tracing::info!(
            session = %created.session_id,
            headless = options.headless,
            "WebDriver session started"
        );

        Ok(Self {
            http,
            session_url: format!("{}/session/{}", options.endpoint, created.session_id),
            options,
            focus: Mutex::new(None),
        })
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.session_url, path);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let success = response.status().is_success();
        decode_reply(success, response.json().await?)
    }

    /// Take the driver lock with `page` focused.
    async fn focused(&self, page: &PageId) -> Result<MutexGuard<'_, Option<String>>> {
        let mut focus = self.focus.lock().await;
        if focus.as_deref() != Some(page.as_str()) {
            *focus = None;
            self.command(Method::POST, "/window", Some(json!({ "handle": page.as_str() })))
                .await?;
            *focus = Some(page.as_str().to_string());
        }
        Ok(focus)
    }

    async fn script(&self, page: &PageId, script: &str, args: Value) -> Result<Value> {
        let _focus = self.focused(page).await?;
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    async fn present(&self, page: &PageId, selector: &str) -> Result<bool> {
        let found = self.script(page, PRESENT_JS, json!([selector])).await?;
        Ok(found.as_bool().unwrap_or(false))
    }

    async fn click(&self, page: &PageId, selector: &str) -> Result<bool> {
        let clicked = self.script(page, CLICK_JS, json!([selector])).await?;
        Ok(clicked.as_bool().unwrap_or(false))
    }

    async fn wait_for(&self, page: &PageId, selector: &str, timeout: Duration) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.present(page, selector).await? {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(INPUT_POLL).await;
        }
    }
}

#[async_trait]
impl AgentSurface for WebDriverSurface {
    fn name(&self) -> &str {
        "webdriver"
    }

    async fn new_page(&self) -> Result<PageId> {
        let _focus = self.focus.lock().await;
        let value = self
            .command(Method::POST, "/window/new", Some(json!({ "type": "tab" })))
            .await?;
        let window: NewWindow = serde_json::from_value(value)?;
        Ok(PageId::new(window.handle))
    }

    async fn navigate(&self, page: &PageId) -> Result<()> {
        let _focus = self.focused(page).await?;
        self.command(
            Method::POST,
            "/url",
            Some(json!({ "url": self.options.agent_url })),
        )
        .await?;
        Ok(())
    }

    async fn probe_authenticated(&self, page: &PageId) -> Result<bool> {
        tokio::time::sleep(self.options.auth_probe_delay).await;
        self.present(page, &self.options.selectors.input).await
    }

    async fn is_alive(&self, page: &PageId) -> Result<bool> {
        let handles = {
            let _focus = self.focus.lock().await;
            self.command(Method::GET, "/window/handles", None).await?
        };
        let open = handles
            .as_array()
            .map(|h| h.iter().any(|v| v.as_str() == Some(page.as_str())))
            .unwrap_or(false);
        if !open {
            return Ok(false);
        }
        Ok(self
            .script(page, "return document.readyState;", json!([]))
            .await
            .is_ok())
    }

    async fn wait_for_input_ready(&self, page: &PageId, timeout: Duration) -> Result<bool> {
        self.wait_for(page, &self.options.selectors.input, timeout)
            .await
    }

    async fn reset_conversation(&self, page: &PageId) -> Result<bool> {
        let clicked = self.click(page, &self.options.selectors.new_chat).await?;
        if clicked {
            tokio::time::sleep(RESET_SETTLE).await;
        }
        Ok(clicked)
    }

    async fn clear_and_insert(&self, page: &PageId, text: &str) -> Result<()> {
        let inserted = self
            .script(page, INSERT_JS, json!([self.options.selectors.editor, text]))
            .await?;
        if inserted.as_bool() != Some(true) {
            return Err(RelayError::Surface(format!(
                "input editor '{}' not found",
                self.options.selectors.editor
            )));
        }
        Ok(())
    }

    async fn submit(&self, page: &PageId) -> Result<bool> {
        let selector = &self.options.selectors.send_button;
        if !self.wait_for(page, selector, SEND_BUTTON_WAIT).await? {
            return Ok(false);
        }
        self.click(page, selector).await
    }

    async fn press_commit_key(&self, page: &PageId) -> Result<()> {
        let _focus = self.focused(page).await?;
        let actions = json!({
            "actions": [{
                "type": "key",
                "id": "keyboard",
                "actions": [
                    { "type": "keyDown", "value": ENTER_KEY },
                    { "type": "keyUp", "value": ENTER_KEY },
                ]
            }]
        });
        self.command(Method::POST, "/actions", Some(actions)).await?;
        self.command(Method::DELETE, "/actions", None).await?;
        Ok(())
    }

    async fn count_response_units(&self, page: &PageId) -> Result<usize> {
        let count = self
            .script(page, COUNT_JS, json!([self.options.selectors.response_unit]))
            .await?;
        Ok(count.as_u64().unwrap_or(0) as usize)
    }

    async fn read_unit(&self, page: &PageId, index: usize) -> Result<Option<ResponseUnit>> {
        let value = self
            .script(
                page,
                READ_JS,
                json!([self.options.selectors.response_unit, index]),
            )
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        let raw: RawUnit = serde_json::from_value(value)?;
        Ok(Some(ResponseUnit::new(raw.markup, raw.text).with_code(raw.code)))
    }

    async fn close(&self, page: &PageId) -> Result<()> {
        let mut focus = self.focused(page).await?;
        *focus = None;
        self.command(Method::DELETE, "/window", None).await?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        let mut focus = self.focus.lock().await;
        *focus = None;
        let response = self.http.delete(&self.session_url).send().await?;
        let success = response.status().is_success();
        decode_reply(success, response.json().await?)?;
        tracing::info!("WebDriver session closed");
        Ok(())
    }
}
