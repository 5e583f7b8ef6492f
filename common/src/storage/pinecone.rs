use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::AppError,
    storage::{
        types::{
            chunk::VectorRecord,
            vector_query::{IndexStats, QueryRequest, QueryResponse},
        },
        vector_index::VectorIndex,
    },
    utils::http::{ensure_success, with_retry},
};

const PROVIDER: &str = "pinecone";

/// Pinecone data-plane client bound to one index host.
#[derive(Clone)]
pub struct PineconeIndex {
    http: reqwest::Client,
    host: String,
    api_key: String,
    attempts: usize,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: Option<usize>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DescribeStatsResponse {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceSummary>,
    #[serde(default)]
    dimension: Option<usize>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct NamespaceSummary {
    #[serde(default)]
    vector_count: u64,
}

impl PineconeIndex {
    pub fn new(
        http: reqwest::Client,
        host: &str,
        api_key: &str,
        attempts: usize,
    ) -> Result<Self, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::Validation("missing Pinecone API key".into()));
        }
        let host = host.trim().trim_end_matches('/');
        if !(host.starts_with("https://") || host.starts_with("http://")) {
            return Err(AppError::Validation(
                "Pinecone host must be an http(s) URL".into(),
            ));
        }

        Ok(Self {
            http,
            host: host.to_string(),
            api_key: api_key.trim().to_string(),
            attempts: attempts.max(1),
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, AppError>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{path}", self.host);
        let url = &url;
        with_retry(PROVIDER, self.attempts, || async move {
            let response = self
                .http
                .post(url)
                .header("Api-Key", self.api_key.as_str())
                .json(body)
                .send()
                .await?;
            Ok(ensure_success(PROVIDER, response).await?.json::<R>().await?)
        })
        .await
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<usize, AppError> {
        if records.is_empty() {
            return Ok(0);
        }

        let body = UpsertRequest {
            vectors: &records,
            namespace,
        };
        let response: UpsertResponse = self.post("/vectors/upsert", &body).await?;
        let upserted = response.upserted_count.unwrap_or(records.len());

        debug!(namespace, upserted, "pinecone upsert acknowledged");
        Ok(upserted)
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, AppError> {
        self.post("/query", &request).await
    }

    async fn stats(&self, namespace: &str) -> Result<IndexStats, AppError> {
        let response: DescribeStatsResponse = self
            .post("/describe_index_stats", &serde_json::json!({}))
            .await?;

        Ok(IndexStats {
            vector_count: response
                .namespaces
                .get(namespace)
                .map_or(0, |summary| summary.vector_count),
            dimension: response.dimension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::chunk::{Chunk, ChunkKind};
    use serde_json::json;

    #[test]
    fn rejects_missing_key_and_bad_host() {
        let http = reqwest::Client::new();
        assert!(PineconeIndex::new(http.clone(), "https://idx.pinecone.io", "", 3).is_err());
        assert!(PineconeIndex::new(http.clone(), "idx.pinecone.io", "key", 3).is_err());

        let index = PineconeIndex::new(http, "https://idx.pinecone.io/", "key", 0)
            .expect("valid config");
        assert_eq!(index.host, "https://idx.pinecone.io");
        assert_eq!(index.attempts, 1);
    }

    #[test]
    fn upsert_body_matches_wire_contract() {
        let record = Chunk::new(
            "doc-1".into(),
            "body".into(),
            "https://www.aven.com/".into(),
            ChunkKind::Markdown,
        )
        .into_record(vec![1.0]);
        let records = vec![record];
        let body = UpsertRequest {
            vectors: &records,
            namespace: "default",
        };
        let value = serde_json::to_value(&body).expect("serialize");

        assert_eq!(value["namespace"], json!("default"));
        assert_eq!(value["vectors"][0]["id"], json!("doc-1"));
        assert_eq!(value["vectors"][0]["values"], json!([1.0]));
        assert_eq!(
            value["vectors"][0]["metadata"]["source"],
            json!("https://www.aven.com/")
        );
        assert_eq!(value["vectors"][0]["metadata"]["type"], json!("markdown"));
        assert!(value["vectors"][0]["metadata"]["ingestedAt"].is_string());
    }

    #[test]
    fn stats_response_reads_namespace_counts() {
        let parsed: DescribeStatsResponse = serde_json::from_value(json!({
            "namespaces": {"default": {"vectorCount": 64}},
            "dimension": 768,
            "indexFullness": 0.0,
            "totalVectorCount": 64
        }))
        .expect("parse stats");

        assert_eq!(parsed.dimension, Some(768));
        assert_eq!(
            parsed.namespaces.get("default").map(|n| n.vector_count),
            Some(64)
        );
    }
}
