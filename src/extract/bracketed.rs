//! `{"tool_calls": [...]}` envelope scan.

use serde_json::{Map, Value};

use crate::types::StructuredCommand;

const KEY: &str = "\"tool_calls\"";

/// Commands from the first `"tool_calls"` array in `text`.
pub fn parse(text: &str) -> Option<Vec<StructuredCommand>> {
    let slice = array_after(text, KEY)?;

    let items: Vec<Value> = serde_json::from_str(slice)
        .or_else(|_| serde_json::from_str(&escape_raw_controls(slice)))
        .ok()?;

    let commands: Vec<StructuredCommand> = items.iter().filter_map(command_from_value).collect();
    (!commands.is_empty()).then_some(commands)
}

/// The balanced `[...]` following `key`.
///
/// Brackets inside JSON string literals do not count, so code carried in
/// argument values cannot cut the array short.
pub fn array_after<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let after = text.find(key)? + key.len();
    let start = after + text[after..].find('[')?;

    let mut depth = 0usize;
    let mut in_str = false;
    let mut escape = false;

    for (offset, c) in text[start..].char_indices() {
        if in_str {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_str = false;
            }
            continue;
        }
        match c {
            '"' => in_str = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Escape raw newlines and tabs that appear inside string literals.
///
/// Rendered answers often break long argument strings across lines, which
/// strict JSON rejects.
fn escape_raw_controls(slice: &str) -> String {
    let mut out = String::with_capacity(slice.len());
    let mut in_str = false;
    let mut escape = false;

    for c in slice.chars() {
        if in_str {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_str = false;
            } else if c == '\n' {
                out.push_str("\\n");
                continue;
            } else if c == '\r' {
                out.push_str("\\r");
                continue;
            } else if c == '\t' {
                out.push_str("\\t");
                continue;
            }
        } else if c == '"' {
            in_str = true;
        }
        out.push(c);
    }
    out
}

fn command_from_value(value: &Value) -> Option<StructuredCommand> {
    let obj = value.as_object()?;
    let (name, arguments) = match obj.get("function").and_then(Value::as_object) {
        Some(function) => (function.get("name"), function.get("arguments")),
        None => (obj.get("name"), obj.get("arguments")),
    };

    let name = name.and_then(Value::as_str).filter(|n| !n.is_empty())?;
    Some(StructuredCommand::new(name, arguments_map(arguments)))
}

/// Arguments as an object; JSON-encoded strings are decoded, anything else
/// becomes `{}`.
pub fn arguments_map(arguments: Option<&Value>) -> Map<String, Value> {
    match arguments {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(encoded)) => serde_json::from_str(encoded).unwrap_or_default(),
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_after_skips_brackets_in_strings() {
        let text = r#"{"tool_calls": [{"name": "write", "arguments": {"content": "a]b[c"}}]} trailing ]"#;
        let slice = array_after(text, KEY).unwrap();
        assert!(slice.starts_with('['));
        assert!(slice.ends_with("}}]"));
        assert!(slice.contains("a]b[c"));
    }

    #[test]
    fn test_array_after_handles_escaped_quotes() {
        let text = r#""tool_calls": [{"name": "x", "arguments": {"s": "say \"]\" now"}}]"#;
        let slice = array_after(text, KEY).unwrap();
        let parsed: Value = serde_json::from_str(slice).unwrap();
        assert_eq!(parsed[0]["arguments"]["s"], "say \"]\" now");
    }

    #[test]
    fn test_unbalanced_array() {
        assert!(array_after(r#""tool_calls": [{"name": "x""#, KEY).is_none());
        assert!(array_after("no key here [1]", KEY).is_none());
    }

    #[test]
    fn test_parse_plain_and_function_shapes() {
        let text = r#"Sure. {"tool_calls": [
            {"name": "read", "arguments": {"filePath": "/a.txt"}},
            {"type": "function", "function": {"name": "list", "arguments": "{\"path\": \"/\"}"}},
            {"name": "bash", "arguments": 42},
            {"arguments": {"orphan": true}}
        ]}"#;
        let commands = parse(text).unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].name, "read");
        assert_eq!(commands[0].arguments["filePath"], json!("/a.txt"));
        assert_eq!(commands[1].name, "list");
        assert_eq!(commands[1].arguments["path"], json!("/"));
        assert!(commands[2].arguments.is_empty());
    }

    #[test]
    fn test_raw_newlines_inside_strings_are_tolerated() {
        let text = "{\"tool_calls\": [{\"name\": \"write\", \"arguments\": {\"content\": \"line1\nline2\"}}]}";
        let commands = parse(text).unwrap();
        assert_eq!(commands[0].arguments["content"], json!("line1\nline2"));
    }

    #[test]
    fn test_invalid_json_yields_none() {
        assert!(parse(r#""tool_calls": [{name: read}]"#).is_none());
        assert!(parse(r#""tool_calls": []"#).is_none());
    }
}
