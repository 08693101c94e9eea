//! Conversation encoder
//!
//! Turns a chat history (plus optional tool definitions) into the single
//! prompt submitted to the agent. When tools are offered, an instruction
//! block describing the `{"tool_calls": [...]}` protocol is prepended.

use serde_json::{json, Map, Value};

use crate::json::to_spaced_string;
use crate::types::{Message, Role, ToolCall, ToolSpec};

/// Placeholder referencing the code block written before a `write` call.
pub const WRITE_PLACEHOLDER: &str = "USE_CODE_BLOCK_ABOVE";
/// Placeholder referencing the first (old) code block of an `edit` call.
pub const OLD_PLACEHOLDER: &str = "USE_OLD_CODE_ABOVE";
/// Placeholder referencing the second (new) code block of an `edit` call.
pub const NEW_PLACEHOLDER: &str = "USE_NEW_CODE_ABOVE";

const RULE: &str =
    "═══════════════════════════════════════════════════════════════════════════════";

const PROTOCOL_HEADER: &str = r#"## TOOL CALLING SYSTEM

You can act on the user's machine through the tools listed below. When a tool
is needed, call it instead of describing what you would do.

To call tools, reply with exactly one JSON object of this shape:
{"tool_calls": [{"name": "<tool>", "arguments": {...}}]}

Several calls go in the same array:
{"tool_calls": [{"name": "read", "arguments": {"filePath": "/a.js"}}, {"name": "read", "arguments": {"filePath": "/b.js"}}]}

Never use YAML and never wrap the JSON itself in a code block.

CODE NEVER GOES INSIDE THE JSON
Write file content in a markdown code block first, then reference it from the
JSON with a literal placeholder string:
- write: "content": "USE_CODE_BLOCK_ABOVE"
- edit:  "oldString": "USE_OLD_CODE_ABOVE", "newString": "USE_NEW_CODE_ABOVE"

WRITE vs EDIT
- write is only for files that do not exist yet.
- Any change to an existing file ("update", "change", "fix", "improve") uses edit.

EDIT FORMAT
1. A code block with the exact old code to find.
2. A second code block with the replacement code.
3. The JSON call using the placeholders:

Old code to replace:
```html
<section id="about">Old content here</section>
```

New replacement:
```html
<section id="skills">New content here</section>
<section id="about">Old content here</section>
```

{"tool_calls": [{"name": "edit", "arguments": {"filePath": "/path/file.html", "oldString": "USE_OLD_CODE_ABOVE", "newString": "USE_NEW_CODE_ABOVE"}}]}

oldString must be exactly "USE_OLD_CODE_ABOVE" and newString exactly
"USE_NEW_CODE_ABOVE". Never put USE_OLD_CODE_ABOVE inside newString.

WRITE FORMAT
```html
<!DOCTYPE html>
<html><body>Content</body></html>
```
{"tool_calls": [{"name": "write", "arguments": {"filePath": "/new-file.html", "content": "USE_CODE_BLOCK_ABOVE"}}]}
"#;

/// Render the tool instruction block, or an empty string without tools.
pub fn tools_prompt(tools: &[ToolSpec]) -> String {
    if tools.is_empty() {
        return String::new();
    }

    let mut prompt = String::from(PROTOCOL_HEADER);
    prompt.push('\n');
    prompt.push_str(RULE);
    prompt.push_str("\nAVAILABLE TOOLS\n");
    prompt.push_str(RULE);
    prompt.push_str("\n\n");

    for tool in tools {
        prompt.push_str("▸ ");
        prompt.push_str(&tool.name);
        if let Some(description) = tool.description.as_deref().filter(|d| !d.is_empty()) {
            prompt.push_str(" - ");
            prompt.push_str(description);
        }
        prompt.push('\n');

        for param in &tool.parameters {
            let required = if param.required { " ⚠REQUIRED" } else { "" };
            prompt.push_str(&format!(
                "    {} ({}){}: {}\n",
                param.name, param.kind, required, param.description
            ));
        }
        prompt.push('\n');
    }

    prompt.push_str(RULE);
    prompt.push_str("\nUse the tools whenever the task needs them.\n");
    prompt.push_str(RULE);
    prompt.push('\n');
    prompt
}

/// Encode the conversation into one prompt.
///
/// Blocks are emitted in message order and joined by a blank line; messages
/// that render to nothing (assistant turns without text or tool calls,
/// unknown roles) are skipped.
pub fn encode(messages: &[Message], tools: &[ToolSpec]) -> String {
    let mut blocks = Vec::with_capacity(messages.len() + 1);

    if !tools.is_empty() {
        blocks.push(tools_prompt(tools));
    }

    blocks.extend(messages.iter().filter_map(render_message));
    blocks.join("\n\n")
}

fn render_message(message: &Message) -> Option<String> {
    let text = message.text();
    match message.role {
        Role::System => Some(format!("System Instructions:\n{text}")),
        Role::User => Some(format!("User: {text}")),
        Role::Assistant => match message.tool_calls.as_deref() {
            Some(calls) if !calls.is_empty() => {
                Some(format!("Assistant: {}", render_tool_calls(calls)))
            }
            _ if !text.is_empty() => Some(format!("Assistant: {text}")),
            _ => None,
        },
        Role::Tool => {
            let name = message.name.as_deref().unwrap_or("tool");
            Some(format!("Tool Result ({name}):\n{text}"))
        }
        Role::Unknown => None,
    }
}

/// Canonical `{"tool_calls": [...]}` form of earlier assistant tool calls.
fn render_tool_calls(calls: &[ToolCall]) -> String {
    let entries: Vec<Value> = calls
        .iter()
        .map(|call| {
            let arguments = serde_json::from_str::<Value>(&call.function.arguments)
                .ok()
                .filter(Value::is_object)
                .unwrap_or_else(|| Value::Object(Map::new()));
            json!({ "name": call.function.name, "arguments": arguments })
        })
        .collect();

    let envelope = json!({ "tool_calls": entries });
    to_spaced_string(&envelope).unwrap_or_else(|_| envelope.to_string())
}
