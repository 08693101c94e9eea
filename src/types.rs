//! Conversation and command types shared by the relay pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    /// Any role this relay does not render (e.g. `developer`).
    #[serde(other)]
    Unknown,
}

/// Message content: either plain text or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One typed part of a multi-part message. Only `"text"` parts are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl MessageContent {
    /// Flatten the content to text; non-text parts are ignored.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter(|p| p.kind == "text")
                .map(|p| p.text.as_deref().unwrap_or(""))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A single message of the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: Option<MessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Text(text.into())),
            tool_call_id: None,
            name: None,
            tool_calls: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn tool(name: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            name: name.map(str::to_string),
            ..Self::new(Role::Tool, text)
        }
    }

    /// Text of the message, empty when there is no content.
    pub fn text(&self) -> String {
        self.content.as_ref().map(MessageContent::text).unwrap_or_default()
    }
}

/// A tool call as it appears in an assistant message of the request history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    pub function: FunctionCall,
}

/// Function name plus its arguments encoded as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    #[serde(default = "empty_arguments")]
    pub arguments: String,
}

pub(crate) fn function_type() -> String {
    "function".to_string()
}

fn empty_arguments() -> String {
    "{}".to_string()
}

/// Wire form of a tool offered to the agent (`{"type": "function", "function": {...}}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<Value>,
}

/// A tool as the encoder describes it to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Vec<ParamSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: String,
    pub description: String,
    pub required: bool,
}

impl From<&ToolDefinition> for ToolSpec {
    fn from(def: &ToolDefinition) -> Self {
        let schema = def.function.parameters.as_ref();
        let required: Vec<&str> = schema
            .and_then(|s| s.get("required"))
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let parameters = schema
            .and_then(|s| s.get("properties"))
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, info)| ParamSpec {
                        name: name.clone(),
                        kind: info
                            .get("type")
                            .and_then(Value::as_str)
                            .unwrap_or("")
                            .to_string(),
                        description: info
                            .get("description")
                            .and_then(Value::as_str)
                            .unwrap_or("")
                            .to_string(),
                        required: required.contains(&name.as_str()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: def.function.name.clone(),
            description: def.function.description.clone(),
            parameters,
        }
    }
}

/// One invocation request recovered from the agent's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredCommand {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl StructuredCommand {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Result of command extraction: plain text or at least one command.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedOutput {
    PlainText(String),
    Commands(Vec<StructuredCommand>),
}

impl ExtractedOutput {
    pub fn commands(&self) -> Option<&[StructuredCommand]> {
        match self {
            ExtractedOutput::Commands(commands) if !commands.is_empty() => Some(commands),
            _ => None,
        }
    }
}

/// A fenced/code segment rendered by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeSegment {
    #[serde(default)]
    pub language: Option<String>,
    pub code: String,
}

impl CodeSegment {
    pub fn new(language: Option<&str>, code: impl Into<String>) -> Self {
        Self {
            language: language.map(str::to_string),
            code: code.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_text_and_parts() {
        let msg: Message = serde_json::from_value(serde_json::json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image_url", "image_url": {"url": "http://x"}},
                {"type": "text", "text": "second"}
            ]
        }))
        .unwrap();
        assert_eq!(msg.text(), "first\nsecond");

        let msg: Message =
            serde_json::from_value(serde_json::json!({"role": "system", "content": "hi"})).unwrap();
        assert_eq!(msg.role, Role::System);
        assert_eq!(msg.text(), "hi");
    }

    #[test]
    fn test_null_content_and_unknown_role() {
        let msg: Message =
            serde_json::from_value(serde_json::json!({"role": "developer", "content": null}))
                .unwrap();
        assert_eq!(msg.role, Role::Unknown);
        assert_eq!(msg.text(), "");
    }

    #[test]
    fn test_tool_spec_from_definition_keeps_order() {
        let def: ToolDefinition = serde_json::from_value(serde_json::json!({
            "type": "function",
            "function": {
                "name": "edit",
                "description": "Edit a file",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "filePath": {"type": "string", "description": "Target"},
                        "oldString": {"type": "string"},
                        "newString": {"type": "string", "description": "Replacement"}
                    },
                    "required": ["filePath", "newString"]
                }
            }
        }))
        .unwrap();

        let spec = ToolSpec::from(&def);
        let names: Vec<_> = spec.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["filePath", "oldString", "newString"]);
        assert!(spec.parameters[0].required);
        assert!(!spec.parameters[1].required);
        assert_eq!(spec.parameters[1].description, "");
        assert!(spec.parameters[2].required);
    }

    #[test]
    fn test_tool_spec_without_parameters() {
        let def: ToolDefinition = serde_json::from_value(serde_json::json!({
            "type": "function",
            "function": {"name": "list"}
        }))
        .unwrap();
        let spec = ToolSpec::from(&def);
        assert_eq!(spec.name, "list");
        assert!(spec.parameters.is_empty());
    }

    #[test]
    fn test_extracted_commands_accessor() {
        let text = ExtractedOutput::PlainText("hi".into());
        assert!(text.commands().is_none());
        let cmds = ExtractedOutput::Commands(vec![StructuredCommand::new("read", Map::new())]);
        assert_eq!(cmds.commands().unwrap().len(), 1);
    }
}
