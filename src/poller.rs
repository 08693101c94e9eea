//! Completion poller
//!
//! Submits a prompt to a page and waits until the newest response unit stops
//! changing. The agent renders its answer progressively, so "done" is inferred
//! from the rendered length staying put across consecutive samples.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::surface::{AgentSurface, PageId};
use crate::types::CodeSegment;

/// Timing knobs of the poll loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Interval between samples
    pub interval: Duration,
    /// Consecutive unchanged samples that count as settled
    pub stable_samples: u32,
    /// Pause after typing, before pressing send
    pub input_settle: Duration,
    /// Pause after pressing send, before sampling starts
    pub submit_settle: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(300),
            stable_samples: 2,
            input_settle: Duration::from_millis(300),
            submit_settle: Duration::from_secs(1),
        }
    }
}

impl From<&RelayConfig> for PollConfig {
    fn from(config: &RelayConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            stable_samples: config.stable_samples.max(1),
            ..Self::default()
        }
    }
}

/// Output of a completed turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettledOutput {
    /// Markup observed at stabilization
    pub markup: String,
    pub text: String,
    pub code_segments: Vec<CodeSegment>,
}

/// Tracks whether successive samples have stopped changing.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    previous_len: usize,
    stable_count: u32,
    threshold: u32,
}

impl StabilityTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            previous_len: 0,
            stable_count: 0,
            threshold,
        }
    }

    /// Record a sample of `len` bytes; `true` once the output has settled.
    ///
    /// Empty samples are ignored: nothing has been rendered yet.
    pub fn observe(&mut self, len: usize) -> bool {
        if len == 0 {
            return false;
        }
        if len == self.previous_len {
            self.stable_count += 1;
        } else {
            self.previous_len = len;
            self.stable_count = 0;
        }
        self.stable_count >= self.threshold
    }
}

/// Submit `text` on `page` and wait for the response to settle.
///
/// `timeout` bounds the polling phase only. The deadline starts after the
/// prompt is inserted and submitted, so typing, the send-button wait and both
/// settle delays come on top of it.
pub async fn submit_and_await(
    surface: &dyn AgentSurface,
    page: &PageId,
    text: &str,
    timeout: Duration,
    config: &PollConfig,
) -> Result<SettledOutput> {
    let before = surface.count_response_units(page).await?;
    tracing::debug!(page = %page, existing = before, len = text.len(), "Submitting prompt");

    surface.clear_and_insert(page, text).await?;
    tokio::time::sleep(config.input_settle).await;

    if !surface.submit(page).await? {
        tracing::debug!(page = %page, "Send action unavailable, pressing commit key");
        surface.press_commit_key(page).await?;
    }
    tokio::time::sleep(config.submit_settle).await;

    let deadline = Instant::now() + timeout;
    let mut tracker = StabilityTracker::new(config.stable_samples);

    loop {
        if Instant::now() >= deadline {
            tracing::warn!(page = %page, timeout_secs = timeout.as_secs(), "Response timed out");
            return Err(RelayError::ResponseTimeout(timeout));
        }

        match sample(surface, page, before).await {
            Ok(Some((index, markup))) => {
                if tracker.observe(markup.len()) {
                    tracing::debug!(page = %page, len = markup.len(), "Response settled");
                    return finish(surface, page, index, markup).await;
                }
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(page = %page, error = %e, "Sample failed, skipping"),
        }

        tokio::time::sleep(config.interval).await;
    }
}

/// Newest unit past `before`, with its index.
async fn sample(
    surface: &dyn AgentSurface,
    page: &PageId,
    before: usize,
) -> Result<Option<(usize, String)>> {
    let count = surface.count_response_units(page).await?;
    if count <= before {
        return Ok(None);
    }
    let index = count - 1;
    Ok(surface
        .read_unit(page, index)
        .await?
        .map(|unit| (index, unit.markup)))
}

async fn finish(
    surface: &dyn AgentSurface,
    page: &PageId,
    index: usize,
    markup: String,
) -> Result<SettledOutput> {
    let (text, code_segments) = match surface.read_unit(page, index).await {
        Ok(Some(unit)) => (unit.text, unit.code_segments),
        Ok(None) => (String::new(), Vec::new()),
        Err(e) => {
            tracing::debug!(page = %page, error = %e, "Final read failed");
            (String::new(), Vec::new())
        }
    };

    Ok(SettledOutput {
        markup,
        text,
        code_segments,
    })
}
