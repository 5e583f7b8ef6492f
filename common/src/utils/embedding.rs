use std::{sync::Arc, time::Duration};

use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{
    error::AppError,
    utils::{
        config::{AppConfig, EmbeddingBackend},
        http::{build_http_client, ensure_success, with_retry},
    },
};

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError>;

    /// Vector length this embedder is configured to produce, when known up front.
    fn dimension(&self) -> Option<usize>;
}

#[derive(Clone)]
pub struct EmbeddingProvider {
    inner: EmbeddingInner,
}

#[derive(Clone)]
enum EmbeddingInner {
    Gemini {
        http: reqwest::Client,
        base_url: String,
        api_key: String,
        model: String,
        attempts: usize,
    },
    OpenAI {
        client: Arc<Client<OpenAIConfig>>,
        model: String,
        dimensions: u32,
    },
    Hashed {
        dimension: usize,
    },
}

impl EmbeddingProvider {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        match config.embedding_backend {
            EmbeddingBackend::Gemini => Self::new_gemini(
                build_http_client(timeout)?,
                config.gemini_base_url.clone(),
                config.google_api_key.clone(),
                config.embedding_model.clone(),
                config.retry_attempts,
            ),
            EmbeddingBackend::OpenAI => {
                let client = Client::with_config(
                    OpenAIConfig::new()
                        .with_api_key(&config.openai_api_key)
                        .with_api_base(&config.openai_base_url),
                )
                .with_http_client(build_http_client(timeout)?);
                Ok(Self::new_openai(
                    Arc::new(client),
                    config.embedding_model.clone(),
                    config.embedding_dimensions,
                ))
            }
            EmbeddingBackend::Hashed => Ok(Self::new_hashed(config.embedding_dimensions as usize)),
        }
    }

    pub fn new_gemini(
        http: reqwest::Client,
        base_url: String,
        api_key: String,
        model: String,
        attempts: usize,
    ) -> Result<Self, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::Validation("missing Google API key".into()));
        }
        Ok(Self {
            inner: EmbeddingInner::Gemini {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
                model: model.trim_start_matches("models/").to_string(),
                attempts: attempts.max(1),
            },
        })
    }

    pub fn new_openai(client: Arc<Client<OpenAIConfig>>, model: String, dimensions: u32) -> Self {
        Self {
            inner: EmbeddingInner::OpenAI {
                client,
                model,
                dimensions,
            },
        }
    }

    pub fn new_hashed(dimension: usize) -> Self {
        Self {
            inner: EmbeddingInner::Hashed {
                dimension: dimension.max(1),
            },
        }
    }

    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            EmbeddingInner::Gemini { .. } => "gemini",
            EmbeddingInner::OpenAI { .. } => "openai",
            EmbeddingInner::Hashed { .. } => "hashed",
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let embedding = match &self.inner {
            EmbeddingInner::Hashed { dimension } => hashed_embedding(text, *dimension),
            EmbeddingInner::Gemini {
                http,
                base_url,
                api_key,
                model,
                attempts,
            } => {
                let url = format!("{base_url}/models/{model}:embedContent");
                let body = GeminiEmbedRequest {
                    model: format!("models/{model}"),
                    content: GeminiContent {
                        parts: vec![GeminiPart { text }],
                    },
                };
                let (url, body) = (&url, &body);
                let response: GeminiEmbedResponse = with_retry("gemini", *attempts, || async move {
                    let response = http
                        .post(url)
                        .header("x-goog-api-key", api_key.as_str())
                        .json(body)
                        .send()
                        .await?;
                    Ok(ensure_success("gemini", response).await?.json().await?)
                })
                .await?;

                response.embedding.map(|e| e.values).unwrap_or_default()
            }
            EmbeddingInner::OpenAI {
                client,
                model,
                dimensions,
            } => {
                let request = CreateEmbeddingRequestArgs::default()
                    .model(model.clone())
                    .input([text])
                    .dimensions(*dimensions)
                    .build()?;

                let response = client.embeddings().create(request).await?;

                response
                    .data
                    .into_iter()
                    .next()
                    .map(|item| item.embedding)
                    .unwrap_or_default()
            }
        };

        debug!(
            backend = self.backend_label(),
            dimensions = embedding.len(),
            "embedding generated"
        );

        Ok(embedding)
    }

    fn dimension(&self) -> Option<usize> {
        match &self.inner {
            EmbeddingInner::Hashed { dimension } => Some(*dimension),
            EmbeddingInner::OpenAI { dimensions, .. } => Some(*dimensions as usize),
            // text-embedding-004 is 768 wide but the model is configurable; trust the reply.
            EmbeddingInner::Gemini { .. } => None,
        }
    }
}

#[derive(Serialize)]
struct GeminiEmbedRequest<'a> {
    model: String,
    content: GeminiContent<'a>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiEmbedResponse {
    #[serde(default)]
    embedding: Option<GeminiEmbedding>,
}

#[derive(Deserialize)]
struct GeminiEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

// Helper functions for hashed embeddings
fn hashed_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let dim = dimension.max(1);
    let mut vector = vec![0.0f32; dim];

    for token in tokens(text) {
        if let Some(slot) = vector.get_mut(bucket(&token, dim)) {
            *slot += 1.0;
        }
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }

    vector
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
}

/// Slot for a token: the first eight bytes of its SHA-256, big-endian, modulo the dimension.
/// Fixed across builds so stored vectors keep matching new queries.
fn bucket(token: &str, dimension: usize) -> usize {
    let prefix = Sha256::digest(token.as_bytes())
        .iter()
        .take(8)
        .fold(0_u64, |acc, byte| (acc << 8) | u64::from(*byte));
    let modulus = u64::try_from(dimension.max(1)).unwrap_or(u64::MAX);
    usize::try_from(prefix % modulus).unwrap_or_default()
}
