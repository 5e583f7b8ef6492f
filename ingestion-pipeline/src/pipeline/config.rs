use std::time::Duration;

use common::utils::config::{AppConfig, ChunkingMode};

#[derive(Debug, Clone)]
pub struct IngestionTuning {
    pub namespace: String,
    pub chunking: ChunkingMode,
    pub max_embed_chars: usize,
    pub chunk_min_chars: usize,
    pub chunk_max_chars: usize,
    pub chunk_overlap: usize,
    pub stage_timeout: Duration,
}

impl Default for IngestionTuning {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            chunking: ChunkingMode::Whole,
            max_embed_chars: 8_000,
            chunk_min_chars: 500,
            chunk_max_chars: 2_000,
            chunk_overlap: 100,
            stage_timeout: Duration::from_secs(90),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestionConfig {
    pub tuning: IngestionTuning,
}

impl IngestionConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        let attempts = u32::try_from(config.retry_attempts.max(1)).unwrap_or(u32::MAX);
        Self {
            tuning: IngestionTuning {
                namespace: config.index_namespace.clone(),
                chunking: config.ingest_chunking,
                max_embed_chars: config.ingest_max_embed_chars,
                chunk_min_chars: config.ingest_chunk_min_chars,
                chunk_max_chars: config.ingest_chunk_max_chars,
                chunk_overlap: config.ingest_chunk_overlap,
                stage_timeout: Duration::from_secs(config.request_timeout_secs.max(1))
                    .saturating_mul(attempts),
            },
        }
    }
}
