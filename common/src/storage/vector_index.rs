use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::info;

use crate::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        pinecone::PineconeIndex,
        types::{
            chunk::VectorRecord,
            vector_query::{IndexStats, QueryRequest, QueryResponse},
        },
    },
    utils::{
        config::{AppConfig, VectorBackend},
        http::build_http_client,
    },
};

/// Stores vectors with metadata and answers nearest-neighbour queries.
///
/// Upserts are keyed by record id within a namespace: writing an existing id
/// replaces the stored vector and metadata.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<usize, AppError>;

    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, AppError>;

    async fn stats(&self, namespace: &str) -> Result<IndexStats, AppError>;
}

/// Builds the configured index backend.
pub async fn vector_index_from_config(
    config: &AppConfig,
) -> Result<Arc<dyn VectorIndex>, AppError> {
    match config.vector_backend {
        VectorBackend::Pinecone => {
            let http = build_http_client(Duration::from_secs(config.request_timeout_secs))?;
            let index = PineconeIndex::new(
                http,
                &config.pinecone_host_url,
                &config.pinecone_api_key,
                config.retry_attempts,
            )?;
            info!(host = %config.pinecone_host_url, "Pinecone vector index configured");
            Ok(Arc::new(index))
        }
        VectorBackend::SurrealDb => {
            let db = SurrealDbClient::new(
                &config.surrealdb_address,
                &config.surrealdb_username,
                &config.surrealdb_password,
                &config.surrealdb_namespace,
                &config.surrealdb_database,
            )
            .await?;
            db.ensure_initialized().await?;
            info!(address = %config.surrealdb_address, "SurrealDB vector index configured");
            Ok(Arc::new(db))
        }
    }
}
