//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the only way the indexer, searchers, and
//! change detector touch persisted chunks. Two backends ship with docqa:
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`SqliteVectorStore`] | durable collection in a SQLite file |
//! | [`InMemoryVectorStore`] | tests and throwaway sessions |
//!
//! Records are keyed by id within one named collection. Similarity is
//! cosine distance (`1 - cosine_similarity`), lower is closer.
//!
//! `get` returns records in insertion order. An upsert of an existing id
//! keeps its original position. [`VectorStore::replace_source`] swaps every
//! record of one source file in a single step, so readers never see a
//! document with part of its chunks missing.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::models::{ChunkRecord, StoredChunk};

/// Distance metric recorded on every collection.
pub const DISTANCE_METRIC: &str = "cosine";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("collection error: {0}")]
    Collection(String),

    #[error("embedding has {actual} dimensions, collection expects {expected}")]
    Dimension { expected: usize, actual: usize },

    #[error("store lock poisoned")]
    Poisoned,
}

/// Equality filter over chunk metadata. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub source: Option<String>,
    pub chunk_id: Option<i64>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            chunk_id: None,
        }
    }

    pub fn with_chunk_id(mut self, chunk_id: i64) -> Self {
        self.chunk_id = Some(chunk_id);
        self
    }

    pub fn matches(&self, chunk: &StoredChunk) -> bool {
        if let Some(source) = &self.source {
            if &chunk.metadata.source != source {
                return false;
            }
        }
        if let Some(chunk_id) = self.chunk_id {
            if chunk.metadata.chunk_id != chunk_id {
                return false;
            }
        }
        true
    }
}

/// A nearest-neighbour hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: StoredChunk,
    pub distance: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of the collection this handle operates on.
    fn collection(&self) -> &str;

    /// Insert records, replacing any record with the same id.
    async fn add(&self, records: Vec<ChunkRecord>) -> Result<(), StoreError>;

    /// Records matching `filter`, in insertion order.
    async fn get(&self, filter: &RecordFilter) -> Result<Vec<StoredChunk>, StoreError>;

    /// Up to `k` records closest to `embedding`, ascending by distance.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StoreError>;

    /// Remove records by id. Unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> Result<(), StoreError>;

    /// Delete every record whose source is `source` and insert `records`,
    /// atomically. On error the previous records are left untouched.
    async fn replace_source(
        &self,
        source: &str,
        records: Vec<ChunkRecord>,
    ) -> Result<(), StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// Distinct `source` values present in the collection.
    async fn sources(&self) -> Result<BTreeSet<String>, StoreError> {
        let all = self.get(&RecordFilter::all()).await?;
        Ok(all.into_iter().map(|c| c.metadata.source).collect())
    }
}

/// Cosine distance: `1 - cosine_similarity`, in `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - crate::embedding::cosine_similarity(a, b)
}

/// Rank `candidates` by distance to `embedding` and keep the closest `k`.
///
/// Ties keep their input order.
pub(crate) fn nearest<I>(embedding: &[f32], candidates: I, k: usize) -> Vec<ScoredChunk>
where
    I: IntoIterator<Item = (StoredChunk, Vec<f32>)>,
{
    let mut scored: Vec<ScoredChunk> = candidates
        .into_iter()
        .map(|(chunk, vector)| ScoredChunk {
            distance: cosine_distance(embedding, &vector),
            chunk,
        })
        .collect();
    scored.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn stored(source: &str, chunk_id: i64) -> StoredChunk {
        StoredChunk {
            id: format!("{}_{}", source, chunk_id),
            text: String::new(),
            metadata: ChunkMetadata {
                source: source.to_string(),
                chunk_id,
                file_hash: "h".to_string(),
            },
        }
    }

    #[test]
    fn test_filter_matching() {
        let c = stored("a.txt", 0);
        assert!(RecordFilter::all().matches(&c));
        assert!(RecordFilter::source("a.txt").matches(&c));
        assert!(RecordFilter::source("a.txt").with_chunk_id(0).matches(&c));
        assert!(!RecordFilter::source("a.txt").with_chunk_id(1).matches(&c));
        assert!(!RecordFilter::source("b.txt").matches(&c));
    }

    #[test]
    fn test_cosine_distance_bounds() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_sorts_and_truncates() {
        let hits = nearest(
            &[1.0, 0.0],
            vec![
                (stored("far.txt", 0), vec![0.0, 1.0]),
                (stored("near.txt", 0), vec![1.0, 0.1]),
                (stored("mid.txt", 0), vec![1.0, 1.0]),
            ],
            2,
        );
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.metadata.source, "near.txt");
        assert_eq!(hits[1].chunk.metadata.source, "mid.txt");
        assert!(hits[0].distance <= hits[1].distance);
    }
}
