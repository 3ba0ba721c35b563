//! Core data models used throughout docqa.
//!
//! These types represent the chunk records stored in the vector store and
//! the search results that flow from retrieval to answer assembly.

use serde::{Deserialize, Serialize};

/// Metadata attached to every stored chunk.
///
/// `file_hash` is the fingerprint of the whole source file at indexing time,
/// so every chunk of one file carries the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk_id: i64,
    pub file_hash: String,
}

/// A chunk as written to the vector store.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A chunk as read back from the vector store (no vector).
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Deterministic chunk id: `"{filename}_{ordinal}"`.
pub fn chunk_record_id(filename: &str, ordinal: usize) -> String {
    format!("{}_{}", filename, ordinal)
}

/// Where a [`SearchResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchOrigin {
    Semantic,
    Fuzzy,
}

/// Retrieved chunks as parallel sequences, lowest distance first for
/// semantic results and scan (or score) order for fuzzy results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<ChunkMetadata>,
    pub distances: Vec<f32>,
    pub origin: SearchOrigin,
}

impl SearchResult {
    pub fn empty(origin: SearchOrigin) -> Self {
        Self {
            ids: Vec::new(),
            documents: Vec::new(),
            metadatas: Vec::new(),
            distances: Vec::new(),
            origin,
        }
    }

    pub fn push(&mut self, chunk: StoredChunk, distance: f32) {
        self.ids.push(chunk.id);
        self.documents.push(chunk.text);
        self.metadatas.push(chunk.metadata);
        self.distances.push(distance);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Change classification of a scanned file against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    New,
    Unchanged,
    Updated,
}

/// A file the indexer could not process, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

/// Outcome of one `auto_index` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub new_files: Vec<String>,
    pub updated_files: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

impl IndexReport {
    pub fn is_up_to_date(&self) -> bool {
        self.new_files.is_empty() && self.updated_files.is_empty()
    }
}
