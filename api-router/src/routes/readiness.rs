use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use common::storage::vector_index::VectorIndex;
use serde_json::json;

use crate::api_state::ApiState;

/// Readiness probe: returns 200 if the vector index answers, else 503.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    let namespace = &state.pipeline.tuning().namespace;
    match state.pipeline.services().index.stats(namespace).await {
        Ok(stats) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "checks": {
                    "index": "ok",
                    "vector_count": stats.vector_count,
                    "dimension": stats.dimension
                }
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "error",
                    "checks": { "index": "fail" }
                })),
            )
        }
    }
}
