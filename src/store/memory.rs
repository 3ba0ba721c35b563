//! In-memory [`VectorStore`] implementation for tests and throwaway sessions.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`, so `get` naturally
//! returns insertion order. Queries are brute-force cosine distance.

use async_trait::async_trait;
use std::sync::RwLock;

use crate::models::{ChunkRecord, StoredChunk};

use super::{nearest, RecordFilter, ScoredChunk, StoreError, VectorStore};

struct StoredRecord {
    chunk: StoredChunk,
    vector: Vec<f32>,
}

pub struct InMemoryVectorStore {
    collection: String,
    records: RwLock<Vec<StoredRecord>>,
}

impl InMemoryVectorStore {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            records: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new("documents")
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

/// All vectors in a collection share the dimension of its first record.
fn check_dimensions<'a>(
    existing: impl Iterator<Item = &'a StoredRecord>,
    incoming: &[ChunkRecord],
) -> Result<(), StoreError> {
    let expected = existing
        .map(|r| r.vector.len())
        .next()
        .or_else(|| incoming.first().map(|r| r.embedding.len()));
    if let Some(expected) = expected {
        if let Some(bad) = incoming.iter().find(|r| r.embedding.len() != expected) {
            return Err(StoreError::Dimension {
                expected,
                actual: bad.embedding.len(),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn add(&self, records: Vec<ChunkRecord>) -> Result<(), StoreError> {
        let mut stored = self.records.write().map_err(|_| StoreError::Poisoned)?;
        check_dimensions(stored.iter(), &records)?;

        for record in records {
            let chunk = StoredChunk {
                id: record.id,
                text: record.text,
                metadata: record.metadata,
            };
            match stored.iter().position(|r| r.chunk.id == chunk.id) {
                Some(i) => {
                    stored[i].chunk = chunk;
                    stored[i].vector = record.embedding;
                }
                None => stored.push(StoredRecord {
                    chunk,
                    vector: record.embedding,
                }),
            }
        }
        Ok(())
    }

    async fn get(&self, filter: &RecordFilter) -> Result<Vec<StoredChunk>, StoreError> {
        let stored = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(stored
            .iter()
            .filter(|r| filter.matches(&r.chunk))
            .map(|r| r.chunk.clone())
            .collect())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        let stored = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(nearest(
            embedding,
            stored.iter().map(|r| (r.chunk.clone(), r.vector.clone())),
            k,
        ))
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut stored = self.records.write().map_err(|_| StoreError::Poisoned)?;
        stored.retain(|r| !ids.contains(&r.chunk.id));
        Ok(())
    }

    async fn replace_source(
        &self,
        source: &str,
        records: Vec<ChunkRecord>,
    ) -> Result<(), StoreError> {
        let mut stored = self.records.write().map_err(|_| StoreError::Poisoned)?;
        check_dimensions(
            stored.iter().filter(|r| r.chunk.metadata.source != source),
            &records,
        )?;

        stored.retain(|r| r.chunk.metadata.source != source);
        stored.extend(records.into_iter().map(|record| StoredRecord {
            chunk: StoredChunk {
                id: record.id,
                text: record.text,
                metadata: record.metadata,
            },
            vector: record.embedding,
        }));
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let stored = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(stored.len())
    }
}
