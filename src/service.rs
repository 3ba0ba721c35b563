//! Process-wide wiring of the pipeline.
//!
//! [`Service`] builds the store, embedder, extractor and generator once and
//! hands out the entry points. Everything is held behind `Arc<dyn _>`, so
//! tests can swap in doubles through [`Service::with_parts`].

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::answer::Assistant;
use crate::config::Config;
use crate::db;
use crate::embedding::{create_provider, Embedder};
use crate::extract::{FileExtractor, TextExtractor};
use crate::generate::{create_generator, AnswerGenerator};
use crate::indexer::Indexer;
use crate::models::{IndexReport, SearchResult};
use crate::progress::IndexProgress;
use crate::search::{SearchError, SemanticSearcher};
use crate::status::{collect_status, StatusReport};
use crate::store::{SqliteVectorStore, VectorStore};

pub struct Service {
    config: Config,
    store: Arc<dyn VectorStore>,
    indexer: Indexer,
    assistant: Assistant,
}

impl Service {
    /// Open the SQLite collection named in `config` and build the providers.
    pub async fn open(config: Config) -> Result<Self> {
        let pool = db::connect(&config).await?;
        let store = SqliteVectorStore::open(pool, config.db.collection.clone())
            .await
            .with_context(|| format!("Failed to open collection '{}'", config.db.collection))?;
        let embedder = create_provider(&config.embedding)?;
        let generator = create_generator(&config.generation)?;

        tracing::debug!(
            embedder = embedder.model_name(),
            generator = generator.model_name(),
            "service ready"
        );

        Ok(Self::with_parts(
            config,
            Arc::new(store),
            embedder,
            generator,
            Arc::new(FileExtractor),
        ))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn AnswerGenerator>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let indexer = Indexer::new(&config, store.clone(), embedder.clone(), extractor);
        let searcher = SemanticSearcher::new(&config.retrieval, store.clone(), embedder);
        let assistant = Assistant::new(
            searcher,
            generator,
            config.retrieval.k,
            config.generation.instructions.clone(),
        );

        Self {
            config,
            store,
            indexer,
            assistant,
        }
    }

    pub async fn auto_index(&self, progress: &dyn IndexProgress) -> Result<IndexReport> {
        self.indexer.auto_index(progress).await
    }

    pub async fn chat(&self, query: &str) -> String {
        self.assistant.chat(query).await
    }

    /// Retrieval only, with the configured fallback.
    pub async fn search(&self, query: &str, k: usize) -> Result<SearchResult, SearchError> {
        self.assistant.searcher().search(query, k).await
    }

    pub fn scan_documents_folder(&self) -> Result<Vec<PathBuf>> {
        crate::scan::scan_documents_folder(&self.config.documents.folder)
    }

    pub async fn status(&self) -> Result<StatusReport> {
        collect_status(self.store.as_ref(), &self.config.documents.folder).await
    }
}
