use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use retrieval_pipeline::QueryError;
use serde::Serialize;
use thiserror::Error;

pub const MISSING_QUESTION: &str = "Missing question";
pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

/// HTTP-facing error. Only the display text reaches the client; the pipeline
/// has already logged the detail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Missing question")]
    MissingQuestion,

    #[error("Internal Server Error")]
    InternalError(String),
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        if err.is_client_error() {
            tracing::debug!(error = %err, "rejected question");
            return Self::MissingQuestion;
        }
        Self::InternalError(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::MissingQuestion => StatusCode::BAD_REQUEST,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
}
