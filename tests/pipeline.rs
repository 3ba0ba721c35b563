//! End-to-end tests of the library pipeline with injected collaborators.
//!
//! The embedder and generator are test doubles; the store is the real
//! SQLite backend, so these runs exercise indexing, retrieval and answer
//! assembly together.

use async_trait::async_trait;
use docqa::config::Config;
use docqa::db;
use docqa::embedding::{Embedder, HashProvider};
use docqa::extract::FileExtractor;
use docqa::generate::{AnswerGenerator, GenerationError};
use docqa::models::SearchOrigin;
use docqa::progress::NoProgress;
use docqa::service::Service;
use docqa::store::{RecordFilter, SqliteVectorStore, VectorStore};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Answers with a fixed sentence and remembers every prompt.
struct EchoGenerator {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl AnswerGenerator for EchoGenerator {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("Refunds are processed within 30 days.".to_string())
    }
}

/// Counts embed calls so tests can assert on batching.
struct CountingEmbedder {
    inner: HashProvider,
    calls: Mutex<Vec<usize>>,
}

#[async_trait]
impl Embedder for CountingEmbedder {
    fn model_name(&self) -> &str {
        "counting"
    }
    fn dims(&self) -> usize {
        self.inner.dims()
    }
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.lock().unwrap().push(texts.len());
        self.inner.embed(texts).await
    }
}

struct Harness {
    _tmp: TempDir,
    docs: std::path::PathBuf,
    service: Service,
    store: Arc<SqliteVectorStore>,
    embedder: Arc<CountingEmbedder>,
    generator: Arc<EchoGenerator>,
}

async fn harness() -> Harness {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("documents");
    std::fs::create_dir_all(&docs).unwrap();

    let mut config = Config::minimal();
    config.documents.folder = docs.clone();
    config.db.path = tmp.path().join("data/docqa.sqlite");
    config.chunking.size = 100;
    config.chunking.overlap = 20;

    let pool = db::connect(&config).await.unwrap();
    let store = Arc::new(SqliteVectorStore::open(pool, "documents").await.unwrap());
    let embedder = Arc::new(CountingEmbedder {
        inner: HashProvider::new(128),
        calls: Mutex::new(Vec::new()),
    });
    let generator = Arc::new(EchoGenerator {
        prompts: Mutex::new(Vec::new()),
    });

    let service = Service::with_parts(
        config,
        store.clone(),
        embedder.clone(),
        generator.clone(),
        Arc::new(FileExtractor),
    );

    Harness {
        _tmp: tmp,
        docs,
        service,
        store,
        embedder,
        generator,
    }
}

#[tokio::test]
async fn test_policy_answer_cites_its_source() {
    let h = harness().await;
    std::fs::write(h.docs.join("policy.txt"), "Refunds are processed within 30 days").unwrap();
    h.service.auto_index(&NoProgress).await.unwrap();

    let response = h.service.chat("refund timeline").await;

    assert!(response.ends_with("Sources: policy.txt"), "got: {}", response);
    let prompts = h.generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("From policy.txt:\nRefunds are processed within 30 days"));
}

#[tokio::test]
async fn test_each_file_is_embedded_in_one_batch() {
    let h = harness().await;
    // 250 chars, window 100, stride 80: offsets 0, 80, 160, 240.
    std::fs::write(h.docs.join("long.txt"), "word ".repeat(50)).unwrap();
    std::fs::write(h.docs.join("short.txt"), "tiny").unwrap();

    let report = h.service.auto_index(&NoProgress).await.unwrap();

    assert_eq!(report.new_files, vec!["long.txt", "short.txt"]);
    assert_eq!(*h.embedder.calls.lock().unwrap(), vec![4, 1]);
    let long = h
        .store
        .get(&RecordFilter::source("long.txt"))
        .await
        .unwrap();
    let ordinals: Vec<i64> = long.iter().map(|c| c.metadata.chunk_id).collect();
    assert_eq!(ordinals, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_unchanged_files_are_not_re_embedded() {
    let h = harness().await;
    std::fs::write(h.docs.join("a.txt"), "alpha").unwrap();
    h.service.auto_index(&NoProgress).await.unwrap();
    h.service.auto_index(&NoProgress).await.unwrap();

    assert_eq!(h.embedder.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_multiple_sources_are_listed_once_in_first_seen_order() {
    let h = harness().await;
    std::fs::write(h.docs.join("a.txt"), "refund policy details").unwrap();
    std::fs::write(h.docs.join("b.txt"), "refund policy exceptions").unwrap();
    h.service.auto_index(&NoProgress).await.unwrap();

    let result = h.service.search("refund policy", 3).await.unwrap();
    assert_eq!(result.len(), 2);

    let response = h.service.chat("refund policy").await;
    let sources = response.rsplit("Sources: ").next().unwrap();
    let mut listed: Vec<&str> = sources.split(", ").collect();
    assert_eq!(listed.len(), 2);
    listed.sort();
    assert_eq!(listed, vec!["a.txt", "b.txt"]);
}

#[tokio::test]
async fn test_typo_query_uses_fuzzy_fallback() {
    let h = harness().await;
    std::fs::write(h.docs.join("policy.txt"), "Refunds are processed within 30 days").unwrap();
    h.service.auto_index(&NoProgress).await.unwrap();

    let result = h.service.search("refnud", 3).await.unwrap();

    assert_eq!(result.origin, SearchOrigin::Fuzzy);
    assert_eq!(result.ids, vec!["policy.txt_0"]);
    assert_eq!(result.distances, vec![0.2]);
}
