//! Argument repair for commands recovered from the JSON envelope.
//!
//! The agent is told to put code in fenced blocks and reference them through
//! placeholders; this layer swaps the placeholders for the rendered code
//! segments and cleans up the usual ways the instruction gets ignored.
//! Repairs never fail: anything unrecognized is left as-is.

use serde_json::Value;

use crate::encoder::{NEW_PLACEHOLDER, OLD_PLACEHOLDER, WRITE_PLACEHOLDER};
use crate::types::{CodeSegment, StructuredCommand};

const PAYLOAD_KEYS: [&str; 2] = ["content", "file_text"];
const OLD_KEYS: [&str; 2] = ["oldString", "old_string"];
const NEW_KEYS: [&str; 2] = ["newString", "new_string"];

/// Inline values at or below this many characters are never un-escaped.
const INLINE_MIN_CHARS: usize = 50;

/// Repair every string argument in place; returns the number of changes.
pub fn repair(command: &mut StructuredCommand, segments: &[CodeSegment]) -> usize {
    let mut repaired = 0;

    let rules: [(&[&str], fn(&str, &[CodeSegment]) -> Option<String>); 3] = [
        (&PAYLOAD_KEYS, repair_payload),
        (&OLD_KEYS, repair_old),
        (&NEW_KEYS, repair_new),
    ];

    for (keys, rule) in rules {
        for key in keys {
            if let Some(Value::String(value)) = command.arguments.get_mut(*key) {
                if let Some(fixed) = rule(value, segments) {
                    if fixed != *value {
                        tracing::debug!(command = %command.name, key, "Repaired argument");
                        *value = fixed;
                        repaired += 1;
                    }
                }
            }
        }
    }

    repaired
}

fn repair_payload(value: &str, segments: &[CodeSegment]) -> Option<String> {
    if value == WRITE_PLACEHOLDER || is_corrupted(value) {
        if let Some(first) = segments.first() {
            return Some(first.code.clone());
        }
    }
    unescape_inline(value, segments)
}

fn repair_old(value: &str, segments: &[CodeSegment]) -> Option<String> {
    if value == OLD_PLACEHOLDER {
        return segments.first().map(|s| s.code.clone());
    }
    unescape_inline(value, segments)
}

fn repair_new(value: &str, segments: &[CodeSegment]) -> Option<String> {
    if value == NEW_PLACEHOLDER {
        return segments.get(1).map(|s| s.code.clone());
    }
    if value.contains(OLD_PLACEHOLDER) {
        let stripped = value.replace(OLD_PLACEHOLDER, "");
        let trimmed = stripped.trim();
        let trimmed = trimmed.strip_prefix("\\n").unwrap_or(trimmed);
        return Some(unescape(trimmed));
    }
    unescape_inline(value, segments)
}

/// Payloads mangled by the renderer: stray `\N`/`\U` escapes or leading blank
/// lines (real or escaped).
fn is_corrupted(value: &str) -> bool {
    value.contains("\\N")
        || value.contains("\\U")
        || value.starts_with("\n\n")
        || value.starts_with("\\n\\n")
}

/// Code written straight into the JSON value with its escapes left literal.
///
/// A value that already holds a real newline, or that is verbatim one of the
/// rendered code segments, has been decoded and is left alone.
fn unescape_inline(value: &str, segments: &[CodeSegment]) -> Option<String> {
    let escaped = value.contains("\\n") || value.contains("\\t") || value.contains("\\\"");
    let qualifies = escaped
        && value.chars().count() > INLINE_MIN_CHARS
        && !value.contains('\n')
        && !segments.iter().any(|s| s.code == value);
    qualifies.then(|| unescape(value))
}

fn unescape(value: &str) -> String {
    value
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\\"", "\"")
}
