use async_trait::async_trait;
use serde::Deserialize;
use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Error, Surreal,
};
use tracing::debug;

use crate::{
    error::AppError,
    storage::{
        indexes::{ensure_runtime_indexes, VECTOR_TABLE},
        types::{
            chunk::VectorRecord,
            vector_query::{IndexStats, Match, MatchMetadata, QueryRequest, QueryResponse},
        },
        vector_index::VectorIndex,
    },
};

#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
}

#[derive(Deserialize)]
struct ScoredRow {
    chunk_id: String,
    score: Option<f64>,
    metadata: Option<MatchMetadata>,
}

#[derive(Deserialize)]
struct CountRow {
    count: u64,
}

#[derive(Deserialize)]
struct DimensionRow {
    dimension: Option<usize>,
}

impl SurrealDbClient {
    /// # Initialize a new database client
    ///
    /// `mem://` addresses skip authentication.
    pub async fn new(
        address: &str,
        username: &str,
        password: &str,
        namespace: &str,
        database: &str,
    ) -> Result<Self, Error> {
        let db = connect(address).await?;

        if !address.starts_with("mem://") {
            db.signin(Root { username, password }).await?;
        }

        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }

    /// Create an in-memory SurrealDB client.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, Error> {
        let db = connect("mem://").await?;

        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }

    pub async fn ensure_initialized(&self) -> Result<(), AppError> {
        ensure_runtime_indexes(self).await
    }

    fn record_key(namespace: &str, id: &str) -> String {
        format!("{namespace}/{id}")
    }
}

#[async_trait]
impl VectorIndex for SurrealDbClient {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<usize, AppError> {
        let count = records.len();

        for record in records {
            let key = Self::record_key(namespace, &record.id);
            self.client
                .query(format!(
                    "UPSERT type::thing('{VECTOR_TABLE}', $key) CONTENT {{
                        chunk_id: $chunk_id,
                        namespace: $namespace,
                        embedding: $embedding,
                        metadata: $metadata,
                        updated_at: time::now()
                    }}"
                ))
                .bind(("key", key))
                .bind(("chunk_id", record.id))
                .bind(("namespace", namespace.to_string()))
                .bind(("embedding", record.values))
                .bind(("metadata", serde_json::to_value(record.metadata)?))
                .await?
                .check()?;
        }

        debug!(namespace, count, "surreal upsert committed");
        Ok(count)
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, AppError> {
        let fields = if request.include_metadata {
            "chunk_id, metadata"
        } else {
            "chunk_id"
        };

        let mut response = self
            .client
            .query(format!(
                "SELECT {fields}, vector::similarity::cosine(embedding, $vector) AS score
                 FROM {VECTOR_TABLE}
                 WHERE namespace = $namespace AND array::len(embedding) = array::len($vector)
                 ORDER BY score DESC
                 LIMIT $top_k"
            ))
            .bind(("vector", request.vector))
            .bind(("namespace", request.namespace))
            .bind(("top_k", request.top_k))
            .await?;

        let rows: Vec<ScoredRow> = response.take(0)?;

        Ok(QueryResponse {
            matches: rows
                .into_iter()
                .map(|row| Match {
                    id: row.chunk_id,
                    score: narrow_score(row.score.unwrap_or_default()),
                    metadata: row.metadata,
                })
                .collect(),
        })
    }

    async fn stats(&self, namespace: &str) -> Result<IndexStats, AppError> {
        let mut response = self
            .client
            .query(format!(
                "SELECT count() AS count FROM {VECTOR_TABLE} WHERE namespace = $namespace GROUP ALL;
                 SELECT array::len(embedding) AS dimension FROM {VECTOR_TABLE} WHERE namespace = $namespace LIMIT 1;"
            ))
            .bind(("namespace", namespace.to_string()))
            .await?;

        let count: Option<CountRow> = response.take(0)?;
        let dimension: Option<DimensionRow> = response.take(1)?;

        Ok(IndexStats {
            vector_count: count.map_or(0, |row| row.count),
            dimension: dimension.and_then(|row| row.dimension),
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
fn narrow_score(score: f64) -> f32 {
    score as f32
}
