use axum::{body::Bytes, extract::State, Json};
use retrieval_pipeline::AskOutcome;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Answers one question. The body is read raw so that malformed JSON surfaces
/// as a server error rather than an extractor rejection.
pub async fn ask(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<AskResponse>, ApiError> {
    let request: AskRequest = serde_json::from_slice(&body)
        .map_err(|e| {
            error!(error = %e, "unreadable ask body");
            ApiError::InternalError(format!("unreadable ask body: {e}"))
        })?;
    let question = request.question.unwrap_or_default();

    let outcome = state.pipeline.answer(&question).await?;
    match &outcome {
        AskOutcome::Answered(answer) => {
            info!(sources = ?answer.sources, "question answered");
        }
        AskOutcome::Blocked(verdict) => {
            info!(category = verdict.category(), "question refused");
        }
    }

    Ok(Json(AskResponse {
        answer: outcome.into_text(),
    }))
}
