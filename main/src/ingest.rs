use common::utils::config::{get_config, ServiceRole};
use ingestion_pipeline::{run_ingestion_batch, IngestManifest, IngestionPipeline};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;
    config.validate_for(ServiceRole::Ingest)?;

    let manifest = IngestManifest::load(&config.ingest_manifest_path).await?;
    info!(
        path = %config.ingest_manifest_path,
        sources = manifest.sources.len(),
        manual_chunks = manifest.manual_chunks.len(),
        acquisition_backend = ?config.acquisition_backend,
        "ingestion manifest loaded"
    );

    let pipeline = IngestionPipeline::from_config(&config).await?;
    let report = run_ingestion_batch(&pipeline, manifest).await;

    if !report.is_clean() {
        warn!(
            failed = report.failed.len(),
            "some sources were left out of the index; rerun to retry them"
        );
    }

    // Per-source failures do not fail the job.
    Ok(())
}
