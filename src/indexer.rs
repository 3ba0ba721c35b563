//! Incremental indexing of the documents folder.
//!
//! For each scanned file the indexer fingerprints it, classifies it against
//! the store and, when NEW or UPDATED, extracts, chunks, embeds and upserts
//! it. UNCHANGED files cost one hash and one metadata lookup.
//!
//! A document is replaced as a whole: the new chunks and their vectors are
//! prepared first, then [`VectorStore::replace_source`] deletes every chunk
//! of the previous version and inserts the new ones in one step. A shorter
//! new version never leaves stale trailing chunks behind, and a failure at
//! any stage leaves the stored version intact.
//!
//! Per-file failures never abort the run. They are logged, reported as a
//! [`IndexEvent::Skipped`] event and listed in [`IndexReport::skipped`].

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::chunk::{chunk_text, ChunkError};
use crate::config::Config;
use crate::embedding::Embedder;
use crate::extract::{ExtractError, TextExtractor};
use crate::fingerprint::{classify, fingerprint};
use crate::models::{chunk_record_id, ChunkMetadata, ChunkRecord, FileStatus, IndexReport, SkippedFile};
use crate::progress::{IndexEvent, IndexProgress};
use crate::scan::{document_name, scan_documents_folder};
use crate::store::{StoreError, VectorStore};

/// Why a single file could not be indexed.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error(transparent)]
    Extraction(#[from] ExtractError),

    #[error("no text could be extracted")]
    EmptyText,

    #[error(transparent)]
    Chunking(#[from] ChunkError),

    #[error("embedding failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error("embedder returned {actual} vectors for {expected} chunks")]
    EmbeddingCount { expected: usize, actual: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Indexer {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn TextExtractor>,
    folder: PathBuf,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Indexer {
    pub fn new(
        config: &Config,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        Self {
            store,
            embedder,
            extractor,
            folder: config.documents.folder.clone(),
            chunk_size: config.chunking.size,
            chunk_overlap: config.chunking.overlap,
        }
    }

    /// Bring the store in line with the documents folder.
    ///
    /// # Errors
    ///
    /// Only a failure to scan the folder is fatal; per-file problems end up
    /// in the report.
    pub async fn auto_index(&self, progress: &dyn IndexProgress) -> Result<IndexReport> {
        let files = scan_documents_folder(&self.folder)?;
        let mut report = IndexReport::default();

        if files.is_empty() {
            progress.report(&IndexEvent::NoDocuments {
                folder: self.folder.display().to_string(),
            });
            return Ok(report);
        }

        for path in &files {
            let filename = document_name(path);
            let current = fingerprint(path);

            let status = match classify(self.store.as_ref(), &filename, &current).await {
                Ok(status) => status,
                Err(e) => {
                    self.skip(&mut report, progress, filename, IndexError::from(e));
                    continue;
                }
            };
            if status == FileStatus::Unchanged {
                tracing::debug!(file = %filename, "unchanged");
                continue;
            }

            progress.report(&IndexEvent::Processing {
                filename: filename.clone(),
            });

            match self.index_file(path, &filename, &current).await {
                Ok(chunks) => {
                    tracing::info!(file = %filename, chunks, ?status, "indexed");
                    match status {
                        FileStatus::Updated => report.updated_files.push(filename),
                        _ => report.new_files.push(filename),
                    }
                }
                Err(e) => self.skip(&mut report, progress, filename, e),
            }
        }

        Ok(report)
    }

    /// Index one NEW or UPDATED file, returning the number of chunks written.
    async fn index_file(
        &self,
        path: &Path,
        filename: &str,
        file_hash: &str,
    ) -> Result<usize, IndexError> {
        let text = self.extractor.extract(path)?;
        if text.is_empty() {
            return Err(IndexError::EmptyText);
        }

        let chunks = chunk_text(&text, self.chunk_size, self.chunk_overlap)?;
        let embeddings = self
            .embedder
            .embed(&chunks)
            .await
            .map_err(IndexError::Embedding)?;
        if embeddings.len() != chunks.len() {
            return Err(IndexError::EmbeddingCount {
                expected: chunks.len(),
                actual: embeddings.len(),
            });
        }

        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, embedding))| ChunkRecord {
                id: chunk_record_id(filename, i),
                embedding,
                text,
                metadata: ChunkMetadata {
                    source: filename.to_string(),
                    chunk_id: i as i64,
                    file_hash: file_hash.to_string(),
                },
            })
            .collect();
        let count = records.len();
        self.store.replace_source(filename, records).await?;
        Ok(count)
    }

    fn skip(
        &self,
        report: &mut IndexReport,
        progress: &dyn IndexProgress,
        filename: String,
        error: IndexError,
    ) {
        let reason = error.to_string();
        tracing::warn!(file = %filename, %reason, "skipping file");
        progress.report(&IndexEvent::Skipped {
            filename: filename.clone(),
            reason: reason.clone(),
        });
        report.skipped.push(SkippedFile { filename, reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{DisabledProvider, HashProvider};
    use crate::extract::FileExtractor;
    use crate::models::{ChunkRecord, StoredChunk};
    use crate::progress::NoProgress;
    use crate::store::{InMemoryVectorStore, RecordFilter, ScoredChunk};
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn config_for(folder: &Path) -> Config {
        let mut config = Config::minimal();
        config.documents.folder = folder.to_path_buf();
        config.chunking.size = 20;
        config.chunking.overlap = 5;
        config
    }

    fn indexer(folder: &Path, store: Arc<dyn VectorStore>) -> Indexer {
        Indexer::new(
            &config_for(folder),
            store,
            Arc::new(HashProvider::new(32)),
            Arc::new(FileExtractor),
        )
    }

    #[tokio::test]
    async fn test_empty_folder_reports_no_documents() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(InMemoryVectorStore::default());
        let seen = Mutex::new(Vec::new());
        let progress = |m: &str| seen.lock().unwrap().push(m.to_string());

        let report = indexer(tmp.path(), store.clone())
            .auto_index(&progress)
            .await
            .unwrap();

        assert_eq!(report, IndexReport::default());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("No documents found in "));
    }

    #[tokio::test]
    async fn test_new_file_is_chunked_with_sequential_ids() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "a".repeat(50)).unwrap();
        let store = Arc::new(InMemoryVectorStore::default());

        let report = indexer(tmp.path(), store.clone())
            .auto_index(&NoProgress)
            .await
            .unwrap();

        assert_eq!(report.new_files, vec!["notes.txt"]);
        // 50 chars, window 20, stride 15: offsets 0, 15, 30, 45.
        let chunks = store.get(&RecordFilter::all()).await.unwrap();
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["notes.txt_0", "notes.txt_1", "notes.txt_2", "notes.txt_3"]);
        let hash = fingerprint(&tmp.path().join("notes.txt"));
        assert!(chunks.iter().all(|c| c.metadata.file_hash == hash));
    }

    #[tokio::test]
    async fn test_reindex_without_changes_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "alpha beta gamma delta epsilon").unwrap();
        std::fs::write(tmp.path().join("b.txt"), "refunds are processed").unwrap();
        let store = Arc::new(InMemoryVectorStore::default());
        let idx = indexer(tmp.path(), store.clone());

        idx.auto_index(&NoProgress).await.unwrap();
        let before = store.get(&RecordFilter::all()).await.unwrap();

        let seen = Mutex::new(Vec::new());
        let progress = |m: &str| seen.lock().unwrap().push(m.to_string());
        let report = idx.auto_index(&progress).await.unwrap();

        assert!(report.is_up_to_date());
        assert!(report.skipped.is_empty());
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(store.get(&RecordFilter::all()).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_updated_file_replaces_all_chunks() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.txt");
        std::fs::write(&path, "x".repeat(60)).unwrap();
        let store = Arc::new(InMemoryVectorStore::default());
        let idx = indexer(tmp.path(), store.clone());
        idx.auto_index(&NoProgress).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 4);

        std::fs::write(&path, "short text").unwrap();
        let report = idx.auto_index(&NoProgress).await.unwrap();

        assert_eq!(report.updated_files, vec!["doc.txt"]);
        assert!(report.new_files.is_empty());
        let chunks = store.get(&RecordFilter::all()).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "short text");
        assert_eq!(chunks[0].metadata.file_hash, fingerprint(&path));
    }

    #[tokio::test]
    async fn test_extraction_failure_skips_only_that_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("bad.pdf"), b"not a pdf").unwrap();
        std::fs::write(tmp.path().join("empty.txt"), b"").unwrap();
        std::fs::write(tmp.path().join("good.txt"), "hello world").unwrap();
        let store = Arc::new(InMemoryVectorStore::default());

        let report = indexer(tmp.path(), store.clone())
            .auto_index(&NoProgress)
            .await
            .unwrap();

        assert_eq!(report.new_files, vec!["good.txt"]);
        let skipped: Vec<&str> = report.skipped.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(skipped, vec!["bad.pdf", "empty.txt"]);
        let sources: Vec<String> = store.sources().await.unwrap().into_iter().collect();
        assert_eq!(sources, vec!["good.txt"]);
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_previous_version() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        std::fs::write(&path, "first version").unwrap();
        let store = Arc::new(InMemoryVectorStore::default());
        indexer(tmp.path(), store.clone())
            .auto_index(&NoProgress)
            .await
            .unwrap();

        std::fs::write(&path, "second version").unwrap();
        let broken = Indexer::new(
            &config_for(tmp.path()),
            store.clone(),
            Arc::new(DisabledProvider),
            Arc::new(FileExtractor),
        );
        let report = broken.auto_index(&NoProgress).await.unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("embedding failed"));
        let chunks = store.get(&RecordFilter::all()).await.unwrap();
        assert_eq!(chunks[0].text, "first version");
    }

    #[tokio::test]
    async fn test_failed_store_write_keeps_previous_version() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "alpha one").unwrap();
        std::fs::write(tmp.path().join("b.txt"), "beta one").unwrap();
        let store = Arc::new(InMemoryVectorStore::default());
        indexer(tmp.path(), store.clone())
            .auto_index(&NoProgress)
            .await
            .unwrap();
        let before = store.get(&RecordFilter::source("b.txt")).await.unwrap();

        // A narrower embedder produces vectors the collection rejects.
        std::fs::write(tmp.path().join("b.txt"), "beta two").unwrap();
        let narrower = Indexer::new(
            &config_for(tmp.path()),
            store.clone(),
            Arc::new(HashProvider::new(16)),
            Arc::new(FileExtractor),
        );
        let report = narrower.auto_index(&NoProgress).await.unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].filename, "b.txt");
        assert!(report.skipped[0].reason.contains("16 dimensions"));
        let after = store.get(&RecordFilter::source("b.txt")).await.unwrap();
        assert_eq!(after, before);
        assert_eq!(after[0].text, "beta one");
    }

    /// Delegates to an in-memory store but refuses to replace one file's chunks.
    struct ReplaceFailsFor {
        inner: InMemoryVectorStore,
        refused: &'static str,
        armed: AtomicBool,
    }

    #[async_trait]
    impl VectorStore for ReplaceFailsFor {
        fn collection(&self) -> &str {
            self.inner.collection()
        }
        async fn add(&self, records: Vec<ChunkRecord>) -> Result<(), StoreError> {
            self.inner.add(records).await
        }
        async fn get(&self, filter: &RecordFilter) -> Result<Vec<StoredChunk>, StoreError> {
            self.inner.get(filter).await
        }
        async fn query(&self, e: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
            self.inner.query(e, k).await
        }
        async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
            self.inner.delete(ids).await
        }
        async fn replace_source(
            &self,
            source: &str,
            records: Vec<ChunkRecord>,
        ) -> Result<(), StoreError> {
            if self.armed.load(Ordering::SeqCst) && source == self.refused {
                return Err(StoreError::Collection("replace refused".into()));
            }
            self.inner.replace_source(source, records).await
        }
        async fn count(&self) -> Result<usize, StoreError> {
            self.inner.count().await
        }
        async fn sources(&self) -> Result<BTreeSet<String>, StoreError> {
            self.inner.sources().await
        }
    }

    #[tokio::test]
    async fn test_store_failure_skips_only_that_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "alpha one").unwrap();
        std::fs::write(tmp.path().join("b.txt"), "beta one").unwrap();
        let store = Arc::new(ReplaceFailsFor {
            inner: InMemoryVectorStore::default(),
            refused: "a.txt",
            armed: AtomicBool::new(false),
        });
        let idx = indexer(tmp.path(), store.clone());
        idx.auto_index(&NoProgress).await.unwrap();
        store.armed.store(true, Ordering::SeqCst);

        std::fs::write(tmp.path().join("a.txt"), "alpha two").unwrap();
        std::fs::write(tmp.path().join("b.txt"), "beta two").unwrap();
        let report = idx.auto_index(&NoProgress).await.unwrap();

        assert_eq!(report.updated_files, vec!["b.txt"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].filename, "a.txt");
        assert!(report.skipped[0].reason.contains("replace refused"));
        let a = store.get(&RecordFilter::source("a.txt")).await.unwrap();
        assert_eq!(a[0].text, "alpha one");
    }
}
