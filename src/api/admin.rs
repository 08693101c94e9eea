//! Service-level endpoints outside the OpenAI surface.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::types::{HealthResponse, StatusMessage};
use crate::error::Result;
use crate::server::state::AppState;
use crate::startup::LoginMarker;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/reset", post(reset))
}

/// GET /health - readiness and live session count.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, sessions) = match state.relay() {
        Some(relay) => ("ready", relay.sessions().len().await),
        None => ("initializing", 0),
    };
    Json(HealthResponse {
        status: status.to_string(),
        sessions,
    })
}

/// POST /reset - forget the saved login. Live sessions keep running; the
/// next start goes through the first-time login again.
pub async fn reset(State(state): State<AppState>) -> Result<Json<StatusMessage>> {
    let removed = LoginMarker::from_config(&state.config).clear()?;
    tracing::info!(removed, "Login marker reset");
    Ok(Json(StatusMessage {
        status: "ok".to_string(),
        message: "Login reset. Restart the service to log in again.".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::RelayConfig;
    use crate::poller::PollConfig;
    use crate::relay::Relay;
    use crate::server::router;
    use crate::surface::memory::MemorySurface;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_initializing() {
        let app = router::build(AppState::new(Arc::new(RelayConfig::default())));
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "initializing");
        assert_eq!(json["sessions"], 0);
    }

    #[tokio::test]
    async fn test_health_ready_after_publish() {
        let state = AppState::new(Arc::new(RelayConfig::default()));
        let relay = Relay::with_timing(
            Arc::new(MemorySurface::new()),
            PollConfig::default(),
            Duration::from_secs(1),
            Duration::from_millis(10),
        );
        assert!(state.set_relay(Arc::new(relay)));
        assert!(state.is_ready());

        let resp = router::build(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["status"], "ready");
    }

    #[tokio::test]
    async fn test_reset_removes_marker() {
        let dir = tempfile::tempdir().unwrap();
        let config = RelayConfig {
            data_dir: dir.path().to_path_buf(),
            ..RelayConfig::default()
        };
        let marker = LoginMarker::from_config(&config);
        marker.mark().unwrap();

        let app = router::build(AppState::new(Arc::new(config)));
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/reset")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
        assert!(!marker.exists());
    }
}
