use serde::{Deserialize, Serialize};

use crate::types::{Message, ToolDefinition};

// ============================================================================
// Chat completion types
// ============================================================================

/// OpenAI-compatible chat completion request.
///
/// Sampling parameters are accepted for compatibility; the agent behind the
/// relay does not expose them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub stream: Option<bool>,
    /// Per-request response timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(default)]
    pub tool_choice: Option<serde_json::Value>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Assistant message of a completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub role: String,
    /// `null` when the turn produced tool calls
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallOut>>,
}

/// Tool call emitted to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallOut {
    /// Position in a streamed delta; omitted in non-streamed responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionOut {
    pub name: String,
    /// JSON-encoded argument object
    pub arguments: String,
}

/// OpenAI-compatible chat completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

/// A single choice in a chat completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: Option<String>,
}

/// A streaming chunk for chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChunkChoice>,
}

/// A single choice in a streaming chat chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChunkChoice {
    pub index: u32,
    pub delta: ChatDelta,
    pub finish_reason: Option<String>,
}

/// Delta content in a streaming chat chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallOut>>,
}

// ============================================================================
// Model listing types
// ============================================================================

/// OpenAI-compatible model list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

/// Metadata about a single model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

// ============================================================================
// Relay management types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ready` or `initializing`
    pub status: String,
    pub sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionList {
    pub sessions: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDeleted {
    pub status: String,
    pub session_id: String,
}

// ============================================================================
// Shared types
// ============================================================================

/// Token usage. The relay cannot see the agent's tokenizer, so these are
/// character counts divided by four.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req: ChatCompletionRequest = serde_json::from_value(serde_json::json!({
            "messages": [{"role": "user", "content": "2+2?"}],
            "temperature": 0.2
        }))
        .unwrap();
        assert!(req.model.is_none());
        assert!(req.stream.is_none());
        assert!(req.tools.is_none());
        assert_eq!(req.messages.len(), 1);
    }

    #[test]
    fn test_missing_messages_deserializes_empty() {
        let req: ChatCompletionRequest =
            serde_json::from_value(serde_json::json!({"model": "gpt-4"})).unwrap();
        assert!(req.messages.is_empty());
    }

    #[test]
    fn test_text_message_serializes_without_tool_calls() {
        let msg = AssistantMessage {
            role: "assistant".to_string(),
            content: Some("4".to_string()),
            tool_calls: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("tool_calls").is_none());
        assert_eq!(value["content"], "4");
    }

    #[test]
    fn test_tool_message_serializes_null_content() {
        let msg = AssistantMessage {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(vec![]),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert!(value["content"].is_null());
    }

    #[test]
    fn test_delta_skips_absent_fields() {
        let delta = ChatDelta {
            content: Some("hi".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&delta).unwrap();
        assert_eq!(value, serde_json::json!({"content": "hi"}));
    }
}
