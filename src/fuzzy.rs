//! Lexical fallback matcher for queries the embedder scores poorly,
//! typically because of typos.
//!
//! Query and chunk text are lower-cased and split on whitespace. Every pair
//! of a query token and a chunk token, both longer than
//! [`MIN_TOKEN_CHARS`] characters, whose character *sets* have a Jaccard
//! similarity above [`SIMILARITY_THRESHOLD`] adds one to the chunk's score.
//! Any chunk scoring above zero is a match and is reported with the fixed
//! distance [`FUZZY_DISTANCE`].
//!
//! Selection is controlled by [`FuzzyRanking`]: `First` returns only the
//! first match in store order; `ScanOrder` returns the first `k` matches and
//! stops scanning; `Score` scores every chunk and keeps the `k` highest, ties
//! in store order.

use std::collections::HashSet;

use crate::config::FuzzyRanking;
use crate::models::{SearchOrigin, SearchResult, StoredChunk};
use crate::store::{RecordFilter, StoreError, VectorStore};

/// Tokens must be longer than this to be compared.
pub const MIN_TOKEN_CHARS: usize = 3;
/// Strict lower bound on character-set Jaccard similarity.
pub const SIMILARITY_THRESHOLD: f64 = 0.7;
/// Distance reported for every fuzzy match.
pub const FUZZY_DISTANCE: f32 = 0.2;

/// `|A ∩ B| / |A ∪ B|` over the distinct characters of `a` and `b`.
///
/// Two empty strings have similarity 0.
pub fn jaccard_char_similarity(a: &str, b: &str) -> f64 {
    let a: HashSet<char> = a.chars().collect();
    let b: HashSet<char> = b.chars().collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

fn long_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() > MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

/// Number of similar (query token, chunk token) pairs.
pub fn fuzzy_score(query_tokens: &[String], text: &str) -> usize {
    if query_tokens.is_empty() {
        return 0;
    }
    let doc_tokens = long_tokens(text);
    query_tokens
        .iter()
        .map(|q| {
            doc_tokens
                .iter()
                .filter(|d| jaccard_char_similarity(q, d) > SIMILARITY_THRESHOLD)
                .count()
        })
        .sum()
}

/// Chunks lexically similar to `query`: one with [`FuzzyRanking::First`],
/// up to `k` otherwise.
///
/// Returns `Ok(None)` when the store is empty or nothing matches.
pub async fn fuzzy_search(
    store: &dyn VectorStore,
    query: &str,
    k: usize,
    ranking: FuzzyRanking,
) -> Result<Option<SearchResult>, StoreError> {
    let chunks = store.get(&RecordFilter::all()).await?;
    if chunks.is_empty() || k == 0 {
        return Ok(None);
    }

    let query_tokens = long_tokens(query);
    let accepted: Vec<StoredChunk> = match ranking {
        FuzzyRanking::First => chunks
            .into_iter()
            .find(|c| fuzzy_score(&query_tokens, &c.text) > 0)
            .into_iter()
            .collect(),
        FuzzyRanking::ScanOrder => chunks
            .into_iter()
            .filter(|c| fuzzy_score(&query_tokens, &c.text) > 0)
            .take(k)
            .collect(),
        FuzzyRanking::Score => {
            let mut scored: Vec<(usize, StoredChunk)> = chunks
                .into_iter()
                .map(|c| (fuzzy_score(&query_tokens, &c.text), c))
                .filter(|(score, _)| *score > 0)
                .collect();
            // Stable sort keeps store order among equal scores.
            scored.sort_by(|a, b| b.0.cmp(&a.0));
            scored.into_iter().take(k).map(|(_, c)| c).collect()
        }
    };

    if accepted.is_empty() {
        return Ok(None);
    }

    let mut result = SearchResult::empty(SearchOrigin::Fuzzy);
    for chunk in accepted {
        result.push(chunk, FUZZY_DISTANCE);
    }
    tracing::debug!(matches = result.len(), "fuzzy fallback matched");
    Ok(Some(result))
}
