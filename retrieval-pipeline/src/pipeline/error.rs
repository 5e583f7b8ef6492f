use std::fmt;

use thiserror::Error;

/// Step of the query pipeline a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Receive,
    Filter,
    Embed,
    Retrieve,
    Assemble,
    Generate,
}

impl QueryStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Receive => "receive",
            Self::Filter => "filter",
            Self::Embed => "embed",
            Self::Retrieve => "retrieve",
            Self::Assemble => "assemble",
            Self::Generate => "generate",
        }
    }
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged failure of one query. The detail is for logs only.
///
/// Holds plain strings so a result can be handed to every caller sharing an
/// in-flight execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("internal pipeline error ({stage}): {detail}")]
    Internal { stage: QueryStage, detail: String },
}

impl QueryError {
    pub fn stage(&self) -> QueryStage {
        match self {
            Self::InvalidInput(_) => QueryStage::Receive,
            Self::Embedding(_) => QueryStage::Embed,
            Self::Retrieval(_) => QueryStage::Retrieve,
            Self::Generation(_) => QueryStage::Generate,
            Self::Internal { stage, .. } => *stage,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_report_their_stage() {
        assert_eq!(
            QueryError::InvalidInput("Missing question".into()).stage(),
            QueryStage::Receive
        );
        assert_eq!(
            QueryError::Retrieval("503".into()).stage(),
            QueryStage::Retrieve
        );
        assert_eq!(
            QueryError::Internal {
                stage: QueryStage::Assemble,
                detail: "bad transition".into()
            }
            .stage(),
            QueryStage::Assemble
        );
    }

    #[test]
    fn only_invalid_input_is_a_client_error() {
        assert!(QueryError::InvalidInput(String::new()).is_client_error());
        assert!(!QueryError::Generation("timeout".into()).is_client_error());
    }
}
