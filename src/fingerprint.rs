//! Change detection by content fingerprint.
//!
//! A file's fingerprint is the lower-case hex SHA-256 of its raw bytes.
//! Every chunk stores the fingerprint of its file at indexing time; the
//! copy on chunk 0 is the version stamp compared against the file on disk.

use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::Path;

use crate::models::FileStatus;
use crate::store::{RecordFilter, StoreError, VectorStore};

/// SHA-256 hex digest of the file, or an empty string if it cannot be read.
pub fn fingerprint(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => fingerprint_bytes(&bytes),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to fingerprint file");
            String::new()
        }
    }
}

pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Distinct `source` values currently in the store.
pub async fn processed_files(store: &dyn VectorStore) -> Result<BTreeSet<String>, StoreError> {
    store.sources().await
}

/// `file_hash` recorded on chunk 0 of `filename`, if any.
pub async fn stored_file_hash(
    store: &dyn VectorStore,
    filename: &str,
) -> Result<Option<String>, StoreError> {
    let hits = store
        .get(&RecordFilter::source(filename).with_chunk_id(0))
        .await?;
    Ok(hits.into_iter().next().map(|c| c.metadata.file_hash))
}

/// Classify `filename` with on-disk fingerprint `current` against the store.
pub async fn classify(
    store: &dyn VectorStore,
    filename: &str,
    current: &str,
) -> Result<FileStatus, StoreError> {
    if !processed_files(store).await?.contains(filename) {
        return Ok(FileStatus::New);
    }
    match stored_file_hash(store, filename).await? {
        Some(stored) if stored == current => Ok(FileStatus::Unchanged),
        _ => Ok(FileStatus::Updated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{chunk_record_id, ChunkMetadata, ChunkRecord};
    use crate::store::InMemoryVectorStore;
    use tempfile::TempDir;

    async fn seed(store: &InMemoryVectorStore, source: &str, hash: &str, chunks: usize) {
        let records = (0..chunks)
            .map(|i| ChunkRecord {
                id: chunk_record_id(source, i),
                embedding: vec![1.0, 0.0],
                text: format!("chunk {}", i),
                metadata: ChunkMetadata {
                    source: source.to_string(),
                    chunk_id: i as i64,
                    file_hash: hash.to_string(),
                },
            })
            .collect();
        store.add(records).await.unwrap();
    }

    #[test]
    fn test_sha256_of_known_input() {
        assert_eq!(
            fingerprint_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_fingerprint_reads_file_and_fails_soft() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        std::fs::write(&path, "abc").unwrap();
        assert_eq!(fingerprint(&path), fingerprint_bytes(b"abc"));
        assert_eq!(fingerprint(&tmp.path().join("missing.txt")), "");
    }

    #[tokio::test]
    async fn test_classify_new_unchanged_updated() {
        let store = InMemoryVectorStore::default();
        assert_eq!(classify(&store, "a.txt", "h1").await.unwrap(), FileStatus::New);

        seed(&store, "a.txt", "h1", 3).await;
        assert_eq!(
            classify(&store, "a.txt", "h1").await.unwrap(),
            FileStatus::Unchanged
        );
        assert_eq!(
            classify(&store, "a.txt", "h2").await.unwrap(),
            FileStatus::Updated
        );
        assert_eq!(
            stored_file_hash(&store, "a.txt").await.unwrap().as_deref(),
            Some("h1")
        );
        assert_eq!(stored_file_hash(&store, "b.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_fingerprint_never_matches_stored_hash() {
        let store = InMemoryVectorStore::default();
        seed(&store, "a.txt", "h1", 1).await;
        assert_eq!(classify(&store, "a.txt", "").await.unwrap(), FileStatus::Updated);
    }

    #[tokio::test]
    async fn test_processed_files_are_distinct_sources() {
        let store = InMemoryVectorStore::default();
        seed(&store, "b.txt", "h", 2).await;
        seed(&store, "a.txt", "h", 2).await;
        let files: Vec<String> = processed_files(&store).await.unwrap().into_iter().collect();
        assert_eq!(files, vec!["a.txt", "b.txt"]);
    }
}
