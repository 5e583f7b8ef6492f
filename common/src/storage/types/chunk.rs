use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Content kind recorded next to every vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Markdown,
    Manual,
}

/// One unit of indexed knowledge. `id` is the upsert key.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub kind: ChunkKind,
    pub ingested_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(id: String, text: String, source: String, kind: ChunkKind) -> Self {
        Self {
            id,
            text,
            source,
            kind,
            ingested_at: Utc::now(),
        }
    }

    pub fn into_record(self, values: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: self.id,
            values,
            metadata: ChunkMetadata {
                source: self.source,
                ingested_at: self.ingested_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                text: self.text,
                kind: Some(self.kind),
            },
        }
    }
}

/// Non-vector fields stored with each record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub source: String,
    pub ingested_at: String,
    pub text: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChunkKind>,
}

/// Upsert payload entry: `{ id, values, metadata }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}
