use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use serde::Serialize;

/// The standard SSE termination marker used by OpenAI-compatible APIs.
pub const SSE_DONE: &str = "[DONE]";

/// Create an SSE response from a stream of pre-serialized payloads.
///
/// Each item is sent as one `data` event.
pub fn sse_response<S>(stream: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = String> + Send + 'static,
{
    use futures::StreamExt;

    let event_stream = stream.map(|data| Ok(Event::default().data(data)));

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}

/// Serialize every item and terminate with `[DONE]`.
pub fn sse_payloads<T: Serialize>(items: &[T]) -> Vec<String> {
    items
        .iter()
        .filter_map(format_sse_data)
        .chain(std::iter::once(SSE_DONE.to_string()))
        .collect()
}

/// Format a single SSE data line from a serializable value.
pub fn format_sse_data<T: Serialize>(value: &T) -> Option<String> {
    serde_json::to_string(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payloads_end_with_done() {
        let payloads = sse_payloads(&[serde_json::json!({"a": 1}), serde_json::json!({"b": 2})]);
        assert_eq!(payloads, vec![r#"{"a":1}"#, r#"{"b":2}"#, "[DONE]"]);
    }

    #[test]
    fn test_empty_stream_still_terminates() {
        let payloads = sse_payloads::<serde_json::Value>(&[]);
        assert_eq!(payloads, vec!["[DONE]"]);
    }
}
