use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Prepare,
    Acquire,
    Chunk,
    Embed,
    Persist,
}

impl IngestStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Acquire => "acquire",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one ingestion input. Caught per input by the batch driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("acquisition failed: {0}")]
    Acquisition(String),
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("upsert failed: {0}")]
    Upsert(String),
    #[error("internal pipeline error ({stage}): {detail}")]
    Internal { stage: IngestStage, detail: String },
}

impl IngestError {
    pub fn stage(&self) -> IngestStage {
        match self {
            Self::InvalidInput(_) => IngestStage::Prepare,
            Self::Acquisition(_) => IngestStage::Acquire,
            Self::Embedding(_) => IngestStage::Embed,
            Self::Upsert(_) => IngestStage::Persist,
            Self::Internal { stage, .. } => *stage,
        }
    }
}
