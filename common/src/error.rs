use async_openai::error::OpenAIError;
use thiserror::Error;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("DOM smoothie error: {0}")]
    DomSmoothie(#[from] dom_smoothie::ReadabilityError),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("{provider} responded with {status}: {body}")]
    Provider {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Whether a retry of the same call has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Reqwest(err) => err.is_connect() || err.is_timeout() || err.is_request(),
            Self::Provider { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_status_classification() {
        let throttled = AppError::Provider {
            provider: "pinecone",
            status: 429,
            body: "slow down".into(),
        };
        let unavailable = AppError::Provider {
            provider: "pinecone",
            status: 503,
            body: String::new(),
        };
        let rejected = AppError::Provider {
            provider: "pinecone",
            status: 400,
            body: "bad vector".into(),
        };

        assert!(throttled.is_transient());
        assert!(unavailable.is_transient());
        assert!(!rejected.is_transient());
        assert!(!AppError::Validation("nope".into()).is_transient());
    }

    #[test]
    fn provider_error_message_carries_detail() {
        let err = AppError::Provider {
            provider: "firecrawl",
            status: 402,
            body: "payment required".into(),
        };
        assert_eq!(err.to_string(), "firecrawl responded with 402: payment required");
    }
}
