use std::{future::Future, time::Duration};

use common::{
    error::AppError,
    storage::types::chunk::{Chunk, ChunkKind},
    utils::config::ChunkingMode,
};
use state_machines::core::GuardError;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::{
    types::{derive_source_id, IngestInput},
    utils::{
        chunking::{split_markdown, truncate_for_embedding},
        url_text_retrieval::ensure_ingestion_url_allowed,
    },
};

use super::{
    context::{AcquiredDocument, PipelineContext},
    error::{IngestError, IngestStage},
    state::{Acquired, Chunked, Embedded, IngestionMachine, Persisted, Ready},
};

#[instrument(level = "trace", skip_all, fields(source = ctx.input.label()))]
pub async fn acquire(
    machine: IngestionMachine<(), Ready>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Acquired>, IngestError> {
    let document = match ctx.input {
        IngestInput::Source(source) => {
            let url = Url::parse(source.url.trim())
                .map_err(|e| IngestError::InvalidInput(format!("invalid URL {}: {e}", source.url)))?;
            ensure_ingestion_url_allowed(&url)
                .map_err(|e| IngestError::InvalidInput(e.to_string()))?;

            let id = source
                .id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map_or_else(|| derive_source_id(&url), str::to_owned);

            let text = within(
                ctx.pipeline_config.tuning.stage_timeout,
                ctx.services.acquirer.acquire(&url),
            )
            .await
            .map_err(|e| IngestError::Acquisition(e.to_string()))?;

            AcquiredDocument {
                id,
                source: source.url.trim().to_string(),
                kind: ChunkKind::Markdown,
                text,
            }
        }
        IngestInput::Manual(chunk) => {
            if chunk.id.trim().is_empty() {
                return Err(IngestError::InvalidInput(
                    "manual chunk is missing an id".into(),
                ));
            }
            AcquiredDocument {
                id: chunk.id.trim().to_string(),
                source: chunk.source.clone(),
                kind: ChunkKind::Manual,
                text: chunk.text.clone(),
            }
        }
    };

    if document.text.trim().is_empty() {
        return Err(IngestError::Acquisition(format!(
            "no usable text for {}",
            ctx.input.label()
        )));
    }

    info!(
        id = %document.id,
        chars = document.text.chars().count(),
        kind = ?document.kind,
        "ingestion input acquired"
    );
    ctx.document = Some(document);

    machine
        .acquire()
        .map_err(|(_, guard)| map_guard_error(IngestStage::Acquire, "acquire", &guard))
}

#[instrument(level = "trace", skip_all, fields(source = ctx.input.label()))]
pub fn chunk(
    machine: IngestionMachine<(), Acquired>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Chunked>, IngestError> {
    let config = ctx.pipeline_config;
    let tuning = &config.tuning;
    let AcquiredDocument {
        id,
        source,
        kind,
        text,
    } = ctx.take_document()?;

    // Curated chunks keep their author-assigned id.
    let mode = match kind {
        ChunkKind::Manual => ChunkingMode::Whole,
        ChunkKind::Markdown => tuning.chunking,
    };

    let chunks = match mode {
        ChunkingMode::Whole => {
            let kept = truncate_for_embedding(&text, tuning.max_embed_chars);
            if kept.len() < text.len() {
                warn!(
                    %id,
                    original_chars = text.chars().count(),
                    kept_chars = tuning.max_embed_chars,
                    "text truncated before embedding"
                );
            }
            vec![Chunk::new(id, kept.to_string(), source, kind)]
        }
        ChunkingMode::Split => split_markdown(
            &text,
            tuning.chunk_min_chars,
            tuning.chunk_max_chars,
            tuning.chunk_overlap,
        )
        .map_err(|e| IngestError::Internal {
            stage: IngestStage::Chunk,
            detail: e.to_string(),
        })?
        .into_iter()
        .enumerate()
        .map(|(idx, piece)| Chunk::new(format!("{id}-{}", idx + 1), piece, source.clone(), kind))
        .collect(),
    };

    if chunks.is_empty() {
        return Err(IngestError::Acquisition(format!(
            "no chunks produced for {}",
            ctx.input.label()
        )));
    }

    debug!(chunks = chunks.len(), mode = ?mode, "ingestion input chunked");
    ctx.chunks = chunks;

    machine
        .chunk()
        .map_err(|(_, guard)| map_guard_error(IngestStage::Chunk, "chunk", &guard))
}

#[instrument(level = "trace", skip_all, fields(source = ctx.input.label()))]
pub async fn embed(
    machine: IngestionMachine<(), Chunked>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Embedded>, IngestError> {
    let embedder = &ctx.services.embedder;
    let timeout = ctx.pipeline_config.tuning.stage_timeout;
    let chunks = std::mem::take(&mut ctx.chunks);
    let mut records = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        let vector = within(timeout, embedder.embed(&chunk.text))
            .await
            .map_err(|e| IngestError::Embedding(format!("{}: {e}", chunk.id)))?;

        if vector.is_empty() {
            return Err(IngestError::Embedding(format!(
                "{}: provider returned an empty vector",
                chunk.id
            )));
        }
        if let Some(expected) = embedder.dimension() {
            if vector.len() != expected {
                return Err(IngestError::Embedding(format!(
                    "{}: expected {expected} dimensions, got {}",
                    chunk.id,
                    vector.len()
                )));
            }
        }

        records.push(chunk.into_record(vector));
    }

    debug!(records = records.len(), "ingestion chunks embedded");
    ctx.records = records;

    machine
        .embed()
        .map_err(|(_, guard)| map_guard_error(IngestStage::Embed, "embed", &guard))
}

#[instrument(level = "trace", skip_all, fields(source = ctx.input.label()))]
pub async fn persist(
    machine: IngestionMachine<(), Embedded>,
    ctx: &mut PipelineContext<'_>,
) -> Result<(IngestionMachine<(), Persisted>, Vec<String>), IngestError> {
    let config = ctx.pipeline_config;
    let tuning = &config.tuning;
    let records = std::mem::take(&mut ctx.records);
    let ids: Vec<String> = records.iter().map(|record| record.id.clone()).collect();

    let upserted = within(
        tuning.stage_timeout,
        ctx.services.index.upsert(&tuning.namespace, records),
    )
    .await
    .map_err(|e| IngestError::Upsert(e.to_string()))?;

    debug!(upserted, namespace = %tuning.namespace, "ingestion records upserted");

    let machine = machine
        .persist()
        .map_err(|(_, guard)| map_guard_error(IngestStage::Persist, "persist", &guard))?;
    Ok((machine, ids))
}

async fn within<T, F>(limit: Duration, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(limit, call).await.map_err(|_| {
        AppError::Timeout(format!("no reply within {} ms", limit.as_millis()))
    })?
}

fn map_guard_error(stage: IngestStage, event: &str, guard: &GuardError) -> IngestError {
    IngestError::Internal {
        stage,
        detail: format!("invalid ingestion pipeline transition during {event}: {guard:?}"),
    }
}
