//! Loose `{"name": ..., "arguments": {...}}` object scan.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::types::StructuredCommand;

/// Cached regex for flat call objects
fn call_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r#"\{\s*"name"\s*:\s*"([^"]+)"\s*,\s*"arguments"\s*:\s*(\{[^{}]*\})"#).ok()
        })
        .as_ref()
}

/// Every flat call object in `text`; malformed argument objects become `{}`.
pub fn parse(text: &str) -> Option<Vec<StructuredCommand>> {
    let commands: Vec<StructuredCommand> = call_pattern()?
        .captures_iter(text)
        .map(|caps| {
            let arguments: Map<String, Value> =
                serde_json::from_str(&caps[2]).unwrap_or_default();
            StructuredCommand::new(&caps[1], arguments)
        })
        .collect();

    (!commands.is_empty()).then_some(commands)
}
