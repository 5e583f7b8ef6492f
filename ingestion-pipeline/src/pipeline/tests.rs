use std::sync::Arc;

use async_trait::async_trait;
use common::{
    error::AppError,
    storage::{db::SurrealDbClient, vector_index::VectorIndex},
    testing::{RecordingEmbedder, RecordingVectorIndex},
    utils::{config::ChunkingMode, embedding::Embedder},
};
use tokio::sync::Mutex;
use url::Url;
use uuid::Uuid;

use super::{
    config::{IngestionConfig, IngestionTuning},
    error::{IngestError, IngestStage},
    services::IngestionServices,
    IngestionPipeline,
};
use crate::{
    types::{IngestInput, ManualChunk, SourceRef},
    utils::acquisition::ContentAcquirer,
};

const DIM: usize = 4;

struct FakeAcquirer {
    text: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeAcquirer {
    fn returning(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            text: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ContentAcquirer for FakeAcquirer {
    async fn acquire(&self, url: &Url) -> Result<String, AppError> {
        self.calls.lock().await.push(url.to_string());
        self.text
            .clone()
            .ok_or_else(|| AppError::InternalError("scrape refused".into()))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

fn tuning() -> IngestionTuning {
    IngestionTuning {
        namespace: "test".into(),
        ..IngestionTuning::default()
    }
}

struct Harness {
    acquirer: Arc<FakeAcquirer>,
    embedder: Arc<RecordingEmbedder>,
    pipeline: IngestionPipeline,
}

impl Harness {
    fn new(
        acquirer: FakeAcquirer,
        embedder: RecordingEmbedder,
        index: Arc<dyn VectorIndex>,
        tuning: IngestionTuning,
    ) -> Self {
        let acquirer = Arc::new(acquirer);
        let embedder = Arc::new(embedder);
        let services = IngestionServices::new(
            Arc::clone(&acquirer) as Arc<dyn ContentAcquirer>,
            Arc::clone(&embedder) as Arc<dyn Embedder>,
            index,
        );
        Self {
            acquirer,
            embedder,
            pipeline: IngestionPipeline::with_services(IngestionConfig { tuning }, services),
        }
    }
}

async fn memory_index() -> Arc<SurrealDbClient> {
    let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
        .await
        .expect("in-memory surrealdb");
    db.ensure_initialized().await.expect("indexes");
    Arc::new(db)
}

fn manual(id: &str, text: &str) -> IngestInput {
    ManualChunk::new(id, text).into()
}

fn source(url: &str) -> IngestInput {
    SourceRef::new(url).into()
}

#[tokio::test]
async fn reingesting_the_same_input_overwrites_its_record() {
    let db = memory_index().await;
    let harness = Harness::new(
        FakeAcquirer::returning("unused"),
        RecordingEmbedder::new(vec![0.1; DIM]),
        Arc::clone(&db) as Arc<dyn VectorIndex>,
        tuning(),
    );
    let input = manual("aven-definition", "Aven is a financial technology company.");

    let first = harness.pipeline.ingest(&input).await.expect("first run");
    let second = harness.pipeline.ingest(&input).await.expect("second run");

    assert_eq!(first, vec!["aven-definition".to_string()]);
    assert_eq!(first, second);
    let stats = db.stats("test").await.expect("stats");
    assert_eq!(stats.vector_count, 1);
    assert!(harness.acquirer.calls().await.is_empty());
}

#[tokio::test]
async fn source_pages_are_keyed_by_derived_slug() {
    let index = Arc::new(RecordingVectorIndex::default());
    let harness = Harness::new(
        FakeAcquirer::returning("# About Aven\n\nHome equity credit."),
        RecordingEmbedder::new(vec![0.2; DIM]),
        Arc::clone(&index) as Arc<dyn VectorIndex>,
        tuning(),
    );

    let ids = harness
        .pipeline
        .ingest(&source("https://www.aven.com/about"))
        .await
        .expect("ingest");

    assert_eq!(ids, vec!["www-aven-com-about".to_string()]);
    assert_eq!(
        harness.acquirer.calls().await,
        vec!["https://www.aven.com/about".to_string()]
    );

    let upserts = index.upserts().await;
    assert_eq!(upserts.len(), 1);
    let (namespace, records) = &upserts[0];
    assert_eq!(namespace, "test");
    assert_eq!(records[0].metadata.source, "https://www.aven.com/about");
    assert_eq!(records[0].metadata.text, "# About Aven\n\nHome equity credit.");
}

#[tokio::test]
async fn explicit_source_id_wins_over_derived_one() {
    let index = Arc::new(RecordingVectorIndex::default());
    let harness = Harness::new(
        FakeAcquirer::returning("Reviews page."),
        RecordingEmbedder::new(vec![0.2; DIM]),
        Arc::clone(&index) as Arc<dyn VectorIndex>,
        tuning(),
    );
    let input = IngestInput::Source(SourceRef {
        url: "https://www.aven.com/reviews".into(),
        id: Some("aven-reviews".into()),
    });

    let ids = harness.pipeline.ingest(&input).await.expect("ingest");

    assert_eq!(ids, vec!["aven-reviews".to_string()]);
}

#[tokio::test]
async fn private_addresses_are_rejected_before_fetching() {
    let harness = Harness::new(
        FakeAcquirer::returning("secret"),
        RecordingEmbedder::new(vec![0.2; DIM]),
        Arc::new(RecordingVectorIndex::default()),
        tuning(),
    );

    let err = harness
        .pipeline
        .ingest(&source("http://127.0.0.1/admin"))
        .await
        .expect_err("loopback rejected");

    assert!(matches!(err, IngestError::InvalidInput(_)));
    assert!(harness.acquirer.calls().await.is_empty());
    assert!(harness.embedder.calls().await.is_empty());
}

#[tokio::test]
async fn empty_page_fails_acquisition_without_embedding() {
    let harness = Harness::new(
        FakeAcquirer::returning("   \n  "),
        RecordingEmbedder::new(vec![0.2; DIM]),
        Arc::new(RecordingVectorIndex::default()),
        tuning(),
    );

    let err = harness
        .pipeline
        .ingest(&source("https://www.aven.com/app"))
        .await
        .expect_err("empty text");

    assert!(matches!(err, IngestError::Acquisition(_)));
    assert!(harness.embedder.calls().await.is_empty());
}

#[tokio::test]
async fn scrape_failure_is_an_acquisition_error() {
    let harness = Harness::new(
        FakeAcquirer::failing(),
        RecordingEmbedder::new(vec![0.2; DIM]),
        Arc::new(RecordingVectorIndex::default()),
        tuning(),
    );

    let err = harness
        .pipeline
        .ingest(&source("https://www.aven.com/contact"))
        .await
        .expect_err("scrape fails");

    assert_eq!(err.stage(), IngestStage::Acquire);
}

#[tokio::test]
async fn long_text_is_truncated_before_embedding() {
    let index = Arc::new(RecordingVectorIndex::default());
    let harness = Harness::new(
        FakeAcquirer::returning(&"a".repeat(50)),
        RecordingEmbedder::new(vec![0.2; DIM]),
        Arc::clone(&index) as Arc<dyn VectorIndex>,
        IngestionTuning {
            max_embed_chars: 20,
            ..tuning()
        },
    );

    harness
        .pipeline
        .ingest(&source("https://www.aven.com/education"))
        .await
        .expect("ingest");

    let embedded = harness.embedder.calls().await;
    assert_eq!(embedded, vec!["a".repeat(20)]);
    let upserts = index.upserts().await;
    assert_eq!(upserts[0].1[0].metadata.text, "a".repeat(20));
}

#[tokio::test]
async fn split_mode_numbers_chunk_ids() {
    let index = Arc::new(RecordingVectorIndex::default());
    let section = "Aven offers home equity lines of credit with no annual fees. ".repeat(10);
    let page = format!("# About\n\n{section}\n\n# Fees\n\n{section}\n\n# App\n\n{section}");
    let harness = Harness::new(
        FakeAcquirer::returning(&page),
        RecordingEmbedder::new(vec![0.2; DIM]),
        Arc::clone(&index) as Arc<dyn VectorIndex>,
        IngestionTuning {
            chunking: ChunkingMode::Split,
            chunk_min_chars: 100,
            chunk_max_chars: 300,
            chunk_overlap: 20,
            ..tuning()
        },
    );

    let ids = harness
        .pipeline
        .ingest(&source("https://www.aven.com/how-it-works"))
        .await
        .expect("ingest");

    assert!(ids.len() > 1);
    assert_eq!(ids[0], "www-aven-com-how-it-works-1");
    assert_eq!(ids[1], "www-aven-com-how-it-works-2");
    assert_eq!(harness.embedder.calls().await.len(), ids.len());
}

#[tokio::test]
async fn manual_chunks_stay_whole_in_split_mode() {
    let harness = Harness::new(
        FakeAcquirer::returning("unused"),
        RecordingEmbedder::new(vec![0.2; DIM]),
        Arc::new(RecordingVectorIndex::default()),
        IngestionTuning {
            chunking: ChunkingMode::Split,
            chunk_min_chars: 100,
            chunk_max_chars: 300,
            chunk_overlap: 20,
            ..tuning()
        },
    );

    let ids = harness
        .pipeline
        .ingest(&manual("aven-fees", &"No annual fees. ".repeat(40)))
        .await
        .expect("ingest");

    assert_eq!(ids, vec!["aven-fees".to_string()]);
}

#[tokio::test]
async fn dimension_mismatch_stops_before_upsert() {
    let index = Arc::new(RecordingVectorIndex::default());
    let harness = Harness::new(
        FakeAcquirer::returning("unused"),
        RecordingEmbedder::new(vec![0.2; DIM]).with_declared_dimension(Some(DIM + 1)),
        Arc::clone(&index) as Arc<dyn VectorIndex>,
        tuning(),
    );

    let err = harness
        .pipeline
        .ingest(&manual("aven-definition", "Aven is a fintech."))
        .await
        .expect_err("mismatch");

    assert!(matches!(err, IngestError::Embedding(_)));
    assert!(index.upserts().await.is_empty());
}

#[tokio::test]
async fn upsert_failure_is_reported_at_persist_stage() {
    let harness = Harness::new(
        FakeAcquirer::returning("unused"),
        RecordingEmbedder::new(vec![0.2; DIM]),
        Arc::new(RecordingVectorIndex::failing()),
        tuning(),
    );

    let err = harness
        .pipeline
        .ingest(&manual("aven-definition", "Aven is a fintech."))
        .await
        .expect_err("upsert fails");

    assert!(matches!(err, IngestError::Upsert(_)));
    assert_eq!(err.stage(), IngestStage::Persist);
}

#[tokio::test]
async fn blank_manual_id_is_invalid() {
    let harness = Harness::new(
        FakeAcquirer::returning("unused"),
        RecordingEmbedder::new(vec![0.2; DIM]),
        Arc::new(RecordingVectorIndex::default()),
        tuning(),
    );

    let err = harness
        .pipeline
        .ingest(&manual("  ", "text"))
        .await
        .expect_err("blank id");

    assert!(matches!(err, IngestError::InvalidInput(_)));
}
