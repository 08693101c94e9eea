use std::time::Duration;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::assembler::{assemble, assemble_chunks};
use crate::api::sse::{sse_payloads, sse_response};
use crate::api::types::ChatCompletionRequest;
use crate::error::Result;
use crate::server::state::AppState;
use crate::types::ToolSpec;

/// POST /v1/chat/completions - OpenAI-compatible chat completion.
///
/// The turn always runs to completion before anything is sent; with
/// `stream: true` the finished answer is replayed as SSE chunks.
pub async fn handler(
    State(state): State<AppState>,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Response> {
    let relay = state.ready()?;

    let tools: Vec<ToolSpec> = request
        .tools
        .iter()
        .flatten()
        .map(ToolSpec::from)
        .collect();
    let timeout = request.timeout.map(Duration::from_secs);
    let model = request
        .model
        .clone()
        .unwrap_or_else(|| state.config.default_model.clone());

    let turn = relay.run_turn(&request.messages, &tools, timeout).await?;

    if request.stream.unwrap_or(false) {
        let payloads = sse_payloads(&assemble_chunks(&turn.output, &model));
        Ok(sse_response(futures::stream::iter(payloads)).into_response())
    } else {
        Ok(Json(assemble(&turn.output, &turn.prompt, &model)).into_response())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::RelayConfig;
    use crate::poller::PollConfig;
    use crate::relay::Relay;
    use crate::server::router;
    use crate::server::state::AppState;
    use crate::surface::memory::MemorySurface;

    fn ready_app(surface: &Arc<MemorySurface>) -> axum::Router {
        let poll = PollConfig {
            interval: std::time::Duration::from_millis(1),
            stable_samples: 2,
            input_settle: std::time::Duration::ZERO,
            submit_settle: std::time::Duration::ZERO,
        };
        let relay = Relay::with_timing(
            surface.clone(),
            poll,
            std::time::Duration::from_secs(5),
            std::time::Duration::from_millis(10),
        );
        router::build(AppState::with_relay(
            Arc::new(RelayConfig::default()),
            Arc::new(relay),
        ))
    }

    fn post(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/chat/completions")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_not_ready_returns_503() {
        let app = router::build(AppState::new(Arc::new(RelayConfig::default())));
        let resp = app
            .oneshot(post(serde_json::json!({"messages": [{"role": "user", "content": "hi"}]})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(resp).await["error"], "Service initializing...");
    }

    #[tokio::test]
    async fn test_empty_messages_returns_400() {
        let surface = Arc::new(MemorySurface::new());
        let resp = ready_app(&surface)
            .oneshot(post(serde_json::json!({"messages": []})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "Invalid request: Messages required");
    }

    #[tokio::test]
    async fn test_model_defaults_from_config() {
        let surface = Arc::new(MemorySurface::new());
        surface.push_text("pong");
        let resp = ready_app(&surface)
            .oneshot(post(serde_json::json!({"messages": [{"role": "user", "content": "ping"}]})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["model"], "gemini-web");
        assert_eq!(json["choices"][0]["message"]["content"], "pong");
    }

    #[tokio::test]
    async fn test_timeout_returns_500() {
        let surface = Arc::new(MemorySurface::new());
        let resp = ready_app(&surface)
            .oneshot(post(serde_json::json!({
                "messages": [{"role": "user", "content": "hello"}],
                "timeout": 0
            })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"], "Timeout after 0s");
    }
}
