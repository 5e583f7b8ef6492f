use std::sync::Arc;

use common::{
    error::AppError,
    storage::vector_index::{vector_index_from_config, VectorIndex},
    utils::{
        config::AppConfig,
        embedding::{Embedder, EmbeddingProvider},
    },
};

use crate::utils::acquisition::{acquirer_from_config, ContentAcquirer};

/// Providers the ingestion pipeline composes.
#[derive(Clone)]
pub struct IngestionServices {
    pub acquirer: Arc<dyn ContentAcquirer>,
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
}

impl IngestionServices {
    pub fn new(
        acquirer: Arc<dyn ContentAcquirer>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            acquirer,
            embedder,
            index,
        }
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Ok(Self::new(
            acquirer_from_config(config)?,
            Arc::new(EmbeddingProvider::from_config(config)?),
            vector_index_from_config(config).await?,
        ))
    }
}
