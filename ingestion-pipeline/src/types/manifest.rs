use std::path::Path;

use common::error::AppError;
use serde::{Deserialize, Serialize};

use super::source::{IngestInput, ManualChunk, SourceRef};

/// The fixed list of things an ingestion run indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestManifest {
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    #[serde(default)]
    pub manual_chunks: Vec<ManualChunk>,
}

impl IngestManifest {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn len(&self) -> usize {
        self.sources.len() + self.manual_chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Manual chunks first, then sources.
    pub fn into_inputs(self) -> Vec<IngestInput> {
        self.manual_chunks
            .into_iter()
            .map(IngestInput::from)
            .chain(self.sources.into_iter().map(IngestInput::from))
            .collect()
    }
}
