#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod pipeline;
pub mod types;
pub mod utils;

pub use pipeline::{
    IngestError, IngestStage, IngestionConfig, IngestionPipeline, IngestionServices,
    IngestionTuning,
};
use tracing::info;
pub use types::{IngestInput, IngestManifest, ManualChunk, SourceRef};

/// One input that could not be indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestFailure {
    pub label: String,
    pub stage: IngestStage,
    pub error: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<IngestFailure>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Ingests every manifest entry in order. A failing entry is recorded and
/// the run moves on to the next one.
pub async fn run_ingestion_batch(
    pipeline: &IngestionPipeline,
    manifest: IngestManifest,
) -> IngestReport {
    let inputs = manifest.into_inputs();
    let total = inputs.len();
    let mut report = IngestReport::default();

    info!(total, "starting ingestion batch");

    for input in &inputs {
        match pipeline.ingest(input).await {
            Ok(ids) => {
                info!(source = input.label(), records = ids.len(), "ingested");
                report.succeeded.extend(ids);
            }
            // Already logged where the pipeline aborted.
            Err(err) => {
                report.failed.push(IngestFailure {
                    label: input.label().to_string(),
                    stage: err.stage(),
                    error: err.to_string(),
                });
            }
        }
    }

    info!(
        total,
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "ingestion batch finished"
    );
    report
}
