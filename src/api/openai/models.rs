use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::api::types::{ModelInfo, ModelList};
use crate::server::state::AppState;

/// GET /v1/models - OpenAI-compatible model listing.
///
/// Every advertised id is served by the same agent; the catalog only exists
/// so clients that validate model names accept the relay.
pub async fn handler(State(state): State<AppState>) -> impl IntoResponse {
    let created = chrono::Utc::now().timestamp();
    let data = state
        .config
        .models
        .iter()
        .map(|id| ModelInfo {
            id: id.clone(),
            object: "model".to_string(),
            created,
            owned_by: state.config.owned_by.clone(),
        })
        .collect();

    Json(ModelList {
        object: "list".to_string(),
        data,
    })
}
