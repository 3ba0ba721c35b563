//! Semantic retrieval with a lexical fallback.
//!
//! [`SemanticSearcher::search`] embeds the query once and asks the store for
//! the `k` nearest chunks by cosine distance. If that comes back empty, or
//! every hit is farther than the configured threshold, the result is
//! considered low-confidence and the fuzzy matcher gets a turn. When the
//! fuzzy matcher finds nothing the weak semantic result is returned as is.
//!
//! Semantic hits are never re-ranked or filtered here.

use std::sync::Arc;

use crate::config::{FuzzyRanking, RetrievalConfig};
use crate::embedding::{embed_query, Embedder};
use crate::fuzzy::fuzzy_search;
use crate::models::{SearchOrigin, SearchResult};
use crate::store::{StoreError, VectorStore};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("embedding failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// True when `result` is empty or every distance exceeds `threshold`.
pub fn is_low_confidence(result: &SearchResult, threshold: f32) -> bool {
    result.is_empty() || result.distances.iter().all(|d| *d > threshold)
}

pub struct SemanticSearcher {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    distance_threshold: f32,
    fuzzy_ranking: FuzzyRanking,
}

impl SemanticSearcher {
    pub fn new(
        retrieval: &RetrievalConfig,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            store,
            embedder,
            distance_threshold: retrieval.distance_threshold,
            fuzzy_ranking: retrieval.fuzzy_ranking,
        }
    }

    /// Up to `k` chunks relevant to `query`.
    pub async fn search(&self, query: &str, k: usize) -> Result<SearchResult, SearchError> {
        let semantic = self.semantic(query, k).await?;

        if !is_low_confidence(&semantic, self.distance_threshold) {
            return Ok(semantic);
        }

        tracing::debug!(
            hits = semantic.len(),
            threshold = self.distance_threshold,
            "low-confidence semantic result, trying fuzzy fallback"
        );
        match fuzzy_search(self.store.as_ref(), query, k, self.fuzzy_ranking).await? {
            Some(fuzzy) => Ok(fuzzy),
            None => Ok(semantic),
        }
    }

    /// Nearest-neighbour lookup only, no fallback.
    pub async fn semantic(&self, query: &str, k: usize) -> Result<SearchResult, SearchError> {
        let embedding = embed_query(self.embedder.as_ref(), query)
            .await
            .map_err(SearchError::Embedding)?;
        let hits = self.store.query(&embedding, k).await?;

        let mut result = SearchResult::empty(SearchOrigin::Semantic);
        for hit in hits {
            result.push(hit.chunk, hit.distance);
        }
        Ok(result)
    }
}
