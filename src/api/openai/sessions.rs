use axum::extract::{Path, State};
use axum::Json;

use crate::api::types::{SessionDeleted, SessionList};
use crate::error::{RelayError, Result};
use crate::server::state::AppState;

/// GET /v1/sessions - ids of live sessions.
pub async fn list(State(state): State<AppState>) -> Json<SessionList> {
    let sessions = match state.relay() {
        Some(relay) => relay.sessions().list_sessions().await,
        None => Vec::new(),
    };
    Json(SessionList {
        count: sessions.len(),
        sessions,
    })
}

/// DELETE /v1/sessions/:id - close a session's page and forget it.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionDeleted>> {
    let relay = state
        .relay()
        .ok_or_else(|| RelayError::SessionNotFound(id.clone()))?;
    relay.sessions().release_session(&id).await?;
    Ok(Json(SessionDeleted {
        status: "deleted".to_string(),
        session_id: id,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::RelayConfig;
    use crate::poller::PollConfig;
    use crate::relay::Relay;
    use crate::server::router;
    use crate::server::state::AppState;
    use crate::surface::memory::MemorySurface;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn state_with_session(id: &str) -> (AppState, Arc<MemorySurface>) {
        let surface = Arc::new(MemorySurface::new());
        let relay = Relay::with_timing(
            surface.clone(),
            PollConfig::default(),
            Duration::from_secs(5),
            Duration::from_millis(10),
        );
        drop(relay.sessions().acquire(id, false).await.unwrap());
        let state = AppState::with_relay(Arc::new(RelayConfig::default()), Arc::new(relay));
        (state, surface)
    }

    #[tokio::test]
    async fn test_list_sessions() {
        let (state, _surface) = state_with_session("abc12345").await;
        let resp = router::build(state)
            .oneshot(Request::builder().uri("/v1/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["sessions"][0], "abc12345");
    }

    #[tokio::test]
    async fn test_delete_session() {
        let (state, surface) = state_with_session("abc12345").await;
        let app = router::build(state);

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/v1/sessions/abc12345")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "deleted");
        assert_eq!(json["session_id"], "abc12345");
        assert_eq!(surface.open_pages(), 0);

        let resp = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/v1/sessions/abc12345")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_before_ready_is_empty() {
        let app = router::build(AppState::new(Arc::new(RelayConfig::default())));
        let resp = app
            .oneshot(Request::builder().uri("/v1/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["count"], 0);
    }
}
