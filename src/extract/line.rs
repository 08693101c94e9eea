//! Line-oriented `tool_calls:` dialect.
//!
//! ```text
//! tool_calls:
//!   - name: read
//!     arguments:
//!       filePath: /a.txt
//! ```
//!
//! Every argument value is kept as a string.

use serde_json::{Map, Value};

use crate::types::StructuredCommand;

pub fn parse(text: &str) -> Option<Vec<StructuredCommand>> {
    if !text.contains("tool_calls:") {
        return None;
    }

    let mut commands = Vec::new();
    let mut current: Option<(String, Map<String, Value>)> = None;
    let mut in_arguments = false;

    for line in text.lines() {
        let stripped = line.trim();

        if let Some(name) = stripped.strip_prefix("- name:") {
            if let Some((name, arguments)) = current.take() {
                commands.push(StructuredCommand::new(name, arguments));
            }
            current = Some((name.trim().to_string(), Map::new()));
            in_arguments = false;
        } else if stripped == "arguments:" && current.is_some() {
            in_arguments = true;
        } else if in_arguments && !stripped.starts_with('-') {
            if let (Some((_, arguments)), Some((key, value))) =
                (current.as_mut(), stripped.split_once(':'))
            {
                arguments.insert(key.trim().to_string(), Value::String(value.trim().to_string()));
            }
        }
    }

    if let Some((name, arguments)) = current {
        commands.push(StructuredCommand::new(name, arguments));
    }

    (!commands.is_empty()).then_some(commands)
}
