//! Response assembler
//!
//! Wraps an extracted agent output into OpenAI-compatible completion objects,
//! either as one response or as the sequence of streaming chunks.

use serde_json::{json, Value};

use super::types::{
    AssistantMessage, ChatChoice, ChatChunkChoice, ChatCompletionChunk, ChatCompletionResponse,
    ChatDelta, FunctionOut, ToolCallOut, Usage,
};
use crate::json::to_spaced_string;
use crate::types::{function_type, ExtractedOutput, StructuredCommand};

const FINISH_STOP: &str = "stop";
const FINISH_TOOL_CALLS: &str = "tool_calls";

/// Approximate token usage: four characters per token.
pub fn approximate_usage(prompt: &str, completion: &str) -> Usage {
    let prompt_chars = prompt.chars().count();
    let completion_chars = completion.chars().count();
    Usage {
        prompt_tokens: (prompt_chars / 4) as u32,
        completion_tokens: (completion_chars / 4) as u32,
        total_tokens: ((prompt_chars + completion_chars) / 4) as u32,
    }
}

fn tool_calls(commands: &[StructuredCommand], indexed: bool) -> Vec<ToolCallOut> {
    commands
        .iter()
        .enumerate()
        .map(|(i, command)| {
            let arguments = Value::Object(command.arguments.clone());
            ToolCallOut {
                index: indexed.then_some(i as u32),
                id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                kind: function_type(),
                function: FunctionOut {
                    name: command.name.clone(),
                    arguments: to_spaced_string(&arguments)
                        .unwrap_or_else(|_| arguments.to_string()),
                },
            }
        })
        .collect()
}

/// Text the usage approximation counts as the completion.
fn completion_text(extracted: &ExtractedOutput) -> String {
    match extracted {
        ExtractedOutput::PlainText(text) => text.clone(),
        ExtractedOutput::Commands(commands) => {
            let envelope = json!({ "tool_calls": commands });
            to_spaced_string(&envelope).unwrap_or_else(|_| envelope.to_string())
        }
    }
}

fn finish_reason(extracted: &ExtractedOutput) -> String {
    match extracted {
        ExtractedOutput::PlainText(_) => FINISH_STOP.to_string(),
        ExtractedOutput::Commands(_) => FINISH_TOOL_CALLS.to_string(),
    }
}

fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4())
}

/// Build the non-streamed response.
pub fn assemble(extracted: &ExtractedOutput, prompt: &str, model: &str) -> ChatCompletionResponse {
    let message = match extracted {
        ExtractedOutput::PlainText(text) => AssistantMessage {
            role: "assistant".to_string(),
            content: Some(text.clone()),
            tool_calls: None,
        },
        ExtractedOutput::Commands(commands) => AssistantMessage {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(tool_calls(commands, false)),
        },
    };

    ChatCompletionResponse {
        id: completion_id(),
        object: "chat.completion".to_string(),
        created: chrono::Utc::now().timestamp(),
        model: model.to_string(),
        choices: vec![ChatChoice {
            index: 0,
            message,
            finish_reason: Some(finish_reason(extracted)),
        }],
        usage: approximate_usage(prompt, &completion_text(extracted)),
    }
}

/// Build the streamed form: a role chunk, the content (or one chunk per tool
/// call), then the finishing chunk. The SSE layer appends `[DONE]`.
pub fn assemble_chunks(extracted: &ExtractedOutput, model: &str) -> Vec<ChatCompletionChunk> {
    let id = completion_id();
    let created = chrono::Utc::now().timestamp();
    let chunk = |delta: ChatDelta, finish_reason: Option<String>| ChatCompletionChunk {
        id: id.clone(),
        object: "chat.completion.chunk".to_string(),
        created,
        model: model.to_string(),
        choices: vec![ChatChunkChoice {
            index: 0,
            delta,
            finish_reason,
        }],
    };

    let mut chunks = vec![chunk(
        ChatDelta {
            role: Some("assistant".to_string()),
            ..Default::default()
        },
        None,
    )];

    match extracted {
        ExtractedOutput::PlainText(text) => chunks.push(chunk(
            ChatDelta {
                content: Some(text.clone()),
                ..Default::default()
            },
            None,
        )),
        ExtractedOutput::Commands(commands) => {
            for call in tool_calls(commands, true) {
                chunks.push(chunk(
                    ChatDelta {
                        tool_calls: Some(vec![call]),
                        ..Default::default()
                    },
                    None,
                ));
            }
        }
    }

    chunks.push(chunk(ChatDelta::default(), Some(finish_reason(extracted))));
    chunks
}
