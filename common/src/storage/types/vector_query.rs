use serde::{Deserialize, Serialize};

/// Similarity query: `{ vector, topK, includeMetadata, namespace }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub include_metadata: bool,
    pub namespace: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub matches: Vec<Match>,
}

/// A nearest-neighbour hit. Ordered by descending `score` as returned by the index.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Match {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<MatchMetadata>,
}

/// Metadata as read back from the index. Every field is optional since the index
/// may hold records written by other tools.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadata {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub ingested_at: Option<String>,
}

impl Match {
    pub fn source(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.source.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn text(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.text.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexStats {
    pub vector_count: u64,
    pub dimension: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_camel_case_keys() {
        let request = QueryRequest {
            vector: vec![0.1],
            top_k: 10,
            include_metadata: true,
            namespace: "default".into(),
        };
        assert_eq!(
            serde_json::to_value(&request).expect("serialize"),
            json!({"vector": [0.1], "topK": 10, "includeMetadata": true, "namespace": "default"})
        );
    }

    #[test]
    fn response_tolerates_missing_matches_and_metadata() {
        let empty: QueryResponse = serde_json::from_value(json!({"namespace": "default"}))
            .expect("parse empty response");
        assert!(empty.matches.is_empty());

        let response: QueryResponse = serde_json::from_value(json!({
            "matches": [
                {"id": "a", "score": 0.91, "values": [], "metadata": {"source": "manual", "text": "hello", "scrapedAt": "x"}},
                {"id": "b", "score": 0.42}
            ]
        }))
        .expect("parse response");

        assert_eq!(response.matches.len(), 2);
        assert_eq!(response.matches[0].source(), "manual");
        assert_eq!(response.matches[0].text(), "hello");
        assert_eq!(response.matches[1].source(), "Unknown");
        assert_eq!(response.matches[1].text(), "");
    }
}
