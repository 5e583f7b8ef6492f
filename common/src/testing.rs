//! In-process fakes for the provider traits. Every fake records the calls it
//! receives so tests can assert on what reached the "network".

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    error::AppError,
    storage::{
        types::{
            chunk::VectorRecord,
            vector_query::{IndexStats, Match, MatchMetadata, QueryRequest, QueryResponse},
        },
        vector_index::VectorIndex,
    },
    utils::{
        embedding::Embedder,
        generation::{AnswerGenerator, GenerationRequest},
    },
};

fn provider_failure(provider: &'static str) -> AppError {
    AppError::Provider {
        provider,
        status: 503,
        body: "fake outage".into(),
    }
}

/// Builds a match carrying `source` and `text` metadata.
pub fn scored_match(id: &str, score: f32, source: &str, text: &str) -> Match {
    Match {
        id: id.into(),
        score,
        metadata: Some(MatchMetadata {
            source: Some(source.into()),
            text: Some(text.into()),
            ingested_at: None,
        }),
    }
}

pub struct RecordingEmbedder {
    vector: Vec<f32>,
    declared_dimension: Option<usize>,
    fail: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl RecordingEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            declared_dimension: Some(vector.len()),
            vector,
            fail: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![0.0; 4])
        }
    }

    #[must_use]
    pub fn with_declared_dimension(mut self, dimension: Option<usize>) -> Self {
        self.declared_dimension = dimension;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Embedder for RecordingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        self.calls.lock().await.push(text.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(provider_failure("fake-embedder"));
        }
        Ok(self.vector.clone())
    }

    fn dimension(&self) -> Option<usize> {
        self.declared_dimension
    }
}

#[derive(Default)]
pub struct RecordingVectorIndex {
    matches: Vec<Match>,
    fail_queries: bool,
    fail_upserts: bool,
    queries: Mutex<Vec<QueryRequest>>,
    upserts: Mutex<Vec<(String, Vec<VectorRecord>)>>,
}

impl RecordingVectorIndex {
    pub fn with_matches(matches: Vec<Match>) -> Self {
        Self {
            matches,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_queries: true,
            fail_upserts: true,
            ..Self::default()
        }
    }

    pub async fn queries(&self) -> Vec<QueryRequest> {
        self.queries.lock().await.clone()
    }

    pub async fn upserts(&self) -> Vec<(String, Vec<VectorRecord>)> {
        self.upserts.lock().await.clone()
    }
}

#[async_trait]
impl VectorIndex for RecordingVectorIndex {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<usize, AppError> {
        let count = records.len();
        self.upserts
            .lock()
            .await
            .push((namespace.to_string(), records));
        if self.fail_upserts {
            return Err(provider_failure("fake-index"));
        }
        Ok(count)
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, AppError> {
        let top_k = request.top_k;
        self.queries.lock().await.push(request);
        if self.fail_queries {
            return Err(provider_failure("fake-index"));
        }
        Ok(QueryResponse {
            matches: self.matches.iter().take(top_k).cloned().collect(),
        })
    }

    async fn stats(&self, _namespace: &str) -> Result<IndexStats, AppError> {
        if self.fail_queries {
            return Err(provider_failure("fake-index"));
        }
        Ok(IndexStats {
            vector_count: self.matches.len() as u64,
            dimension: None,
        })
    }
}

pub struct RecordingGenerator {
    reply: Option<String>,
    fail: bool,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl RecordingGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Provider answers, but with no content.
    pub fn empty() -> Self {
        Self {
            reply: None,
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            fail: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl AnswerGenerator for RecordingGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<Option<String>, AppError> {
        self.requests.lock().await.push(request);
        if self.fail {
            return Err(provider_failure("fake-generator"));
        }
        Ok(self.reply.clone())
    }
}
