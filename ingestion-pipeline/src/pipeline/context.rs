use common::storage::types::chunk::{Chunk, ChunkKind, VectorRecord};
use tracing::error;

use crate::types::IngestInput;

use super::{
    config::IngestionConfig,
    error::{IngestError, IngestStage},
    services::IngestionServices,
};

/// Text obtained for one input, before chunking.
#[derive(Debug, Clone)]
pub struct AcquiredDocument {
    pub id: String,
    pub source: String,
    pub kind: ChunkKind,
    pub text: String,
}

pub struct PipelineContext<'a> {
    pub input: &'a IngestInput,
    pub pipeline_config: &'a IngestionConfig,
    pub services: &'a IngestionServices,
    pub document: Option<AcquiredDocument>,
    pub chunks: Vec<Chunk>,
    pub records: Vec<VectorRecord>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        input: &'a IngestInput,
        pipeline_config: &'a IngestionConfig,
        services: &'a IngestionServices,
    ) -> Self {
        Self {
            input,
            pipeline_config,
            services,
            document: None,
            chunks: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn take_document(&mut self) -> Result<AcquiredDocument, IngestError> {
        self.document.take().ok_or_else(|| IngestError::Internal {
            stage: IngestStage::Chunk,
            detail: "acquired document expected to be available".into(),
        })
    }

    pub fn abort(&self, err: IngestError) -> IngestError {
        error!(
            source = self.input.label(),
            stage = %err.stage(),
            error = %err,
            "ingestion pipeline aborted"
        );
        err
    }
}
