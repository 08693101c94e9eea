//! Agent surface trait — the seam between the relay and the agent front-end
//!
//! The relay never talks to the agent directly. It drives a page of an
//! interactive front-end through `AgentSurface`: type text, press send, and
//! read back whatever the page has rendered so far.
//!
//! ## Implementations
//!
//! - **webdriver** — a real browser driven over the W3C WebDriver protocol
//! - **memory** — scripted in-process surface for tests and offline runs

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::CodeSegment;

pub mod memory;
pub mod webdriver;

/// Opaque handle to one page (tab) of the surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageId(String);

impl PageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of one rendered response unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseUnit {
    /// Rich-text (HTML) rendering; its length drives the stability check.
    pub markup: String,
    /// Plain inner text as displayed.
    pub text: String,
    /// Code blocks contained in the unit, in document order.
    pub code_segments: Vec<CodeSegment>,
}

impl ResponseUnit {
    pub fn new(markup: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            text: text.into(),
            code_segments: Vec::new(),
        }
    }

    pub fn with_code(mut self, segments: Vec<CodeSegment>) -> Self {
        self.code_segments = segments;
        self
    }
}

/// Interactive agent front-end driven page by page.
///
/// Probe-style operations report their outcome as `bool`/`Option` instead of
/// failing: a missing affordance is an expected state, not an error. `Err` is
/// reserved for transport failures.
#[async_trait]
pub trait AgentSurface: Send + Sync {
    /// Surface name (e.g., "webdriver", "memory")
    fn name(&self) -> &str;

    /// Open a new blank page.
    async fn new_page(&self) -> Result<PageId>;

    /// Load the agent's entry point in `page`.
    async fn navigate(&self, page: &PageId) -> Result<()>;

    /// Whether the loaded page belongs to a logged-in user.
    async fn probe_authenticated(&self, page: &PageId) -> Result<bool>;

    /// Whether the page still exists and can be driven.
    async fn is_alive(&self, page: &PageId) -> Result<bool>;

    /// Wait up to `timeout` for the input box; `false` if it never appeared.
    async fn wait_for_input_ready(&self, page: &PageId, timeout: Duration) -> Result<bool>;

    /// Start a fresh conversation; `false` if the page offers no reset action.
    async fn reset_conversation(&self, page: &PageId) -> Result<bool>;

    /// Replace the input box contents with `text`.
    async fn clear_and_insert(&self, page: &PageId, text: &str) -> Result<()>;

    /// Press the dedicated send action; `false` if it is unavailable.
    async fn submit(&self, page: &PageId) -> Result<bool>;

    /// Generic commit key (Enter) used when no send action exists.
    async fn press_commit_key(&self, page: &PageId) -> Result<()>;

    /// Number of response units currently rendered.
    async fn count_response_units(&self, page: &PageId) -> Result<usize>;

    /// Read unit `index`; `None` if it does not exist (yet).
    async fn read_unit(&self, page: &PageId, index: usize) -> Result<Option<ResponseUnit>>;

    /// Close the page.
    async fn close(&self, page: &PageId) -> Result<()>;

    /// Tear down the whole surface (browser process, driver session).
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
