//! Command extractor
//!
//! Recovers structured commands from free-form agent output. Strategies run
//! in order and the first one that yields at least one command wins:
//!
//! 1. **bracketed** — the `{"tool_calls": [...]}` envelope, followed by the
//!    placeholder repair layer
//! 2. **line** — the `tool_calls:` / `- name:` line dialect
//! 3. **loose** — any flat `{"name": ..., "arguments": {...}}` object
//!
//! Output matching none of them is a plain-text answer and is converted from
//! markup to Markdown. Falling through is logged, never an error. When the
//! client offered no tools, no strategy runs and the answer is always text.

pub mod bracketed;
pub mod line;
pub mod loose;
pub mod markup;
pub mod repair;

use crate::poller::SettledOutput;
use crate::types::{CodeSegment, ExtractedOutput, StructuredCommand};

/// Undo the renderer's markdown escaping of underscores.
pub fn normalize(text: &str) -> String {
    text.replace("\\_", "_")
}

/// Classify a settled output as commands or plain text.
pub fn extract(output: &SettledOutput, tools_offered: bool) -> ExtractedOutput {
    if tools_offered {
        if let Some(commands) = extract_commands(&output.text, &output.code_segments) {
            return ExtractedOutput::Commands(commands);
        }
    }
    ExtractedOutput::PlainText(markup::to_markdown(&output.markup, &output.text))
}

/// Commands found in `text`, or `None` for a plain answer.
pub fn extract_commands(text: &str, segments: &[CodeSegment]) -> Option<Vec<StructuredCommand>> {
    let text = normalize(text);

    if let Some(mut commands) = bracketed::parse(&text) {
        let repaired: usize = commands
            .iter_mut()
            .map(|command| repair::repair(command, segments))
            .sum();
        tracing::debug!(commands = commands.len(), repaired, "Parsed tool_calls envelope");
        return Some(commands);
    }

    if text.contains("tool_calls") {
        tracing::debug!("tool_calls envelope unparseable, trying fallbacks");
    }

    if let Some(commands) = line::parse(&text) {
        tracing::debug!(commands = commands.len(), "Parsed line-style tool_calls");
        return Some(commands);
    }

    let commands = loose::parse(&text)?;
    tracing::debug!(commands = commands.len(), "Parsed loose call objects");
    Some(commands)
}
