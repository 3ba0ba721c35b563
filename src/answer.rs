//! Answer assembly: retrieval, context building, prompting, attribution.
//!
//! [`Assistant::chat`] never fails. Retrieval and generation errors are
//! folded into the returned text so the caller always has something to
//! show the user.

use std::collections::HashSet;
use std::sync::Arc;

use crate::generate::AnswerGenerator;
use crate::models::SearchResult;
use crate::search::SemanticSearcher;

/// Returned when retrieval finds no chunks at all.
pub const NO_DOCUMENTS_MESSAGE: &str =
    "I don't have any documents to search through. Please add some documents first.";

/// Grounding rules placed before the retrieved context.
pub const DEFAULT_INSTRUCTIONS: &str = "\
You are a highly reliable assistant that answers ONLY using the provided context.

STRICT RULES:
1. ONLY use information found in the context below. Do not make up information or rely on outside sources.
2. If the answer is not in the context, reply: \"I don't have information about that in the provided documents.\"
3. Always cite the document each piece of information comes from, by filename.
4. Be concise, accurate and clear. Structure answers for quick reference.
5. If several documents are relevant, synthesize the answer and cite every source used.
6. Do not assume or guess. Stick to the facts in the context.
7. Answer simple greetings with a short acknowledgement such as \"Hello! How can I assist you today?\".
8. If the question is vague or too broad, ask for clarification instead of guessing.
9. If the question is unrelated to the documents, say politely that you can only help with topics they cover.
10. Keep a professional and neutral tone.";

/// `"From {source}:\n{text}\n\n"` for every retrieved chunk, in result order.
pub fn build_context(result: &SearchResult) -> String {
    let mut context = String::new();
    for (text, meta) in result.documents.iter().zip(&result.metadatas) {
        context.push_str("From ");
        context.push_str(&meta.source);
        context.push_str(":\n");
        context.push_str(text);
        context.push_str("\n\n");
    }
    context
}

/// Sources of `result`, each once, in order of first appearance.
pub fn distinct_sources(result: &SearchResult) -> Vec<String> {
    let mut seen = HashSet::new();
    result
        .metadatas
        .iter()
        .filter(|meta| seen.insert(meta.source.as_str()))
        .map(|meta| meta.source.clone())
        .collect()
}

pub fn build_prompt(instructions: &str, context: &str, query: &str) -> String {
    format!(
        "{instructions}\n\nContext from the documents:\n-----\n{context}-----\n\n\
         Use ONLY this information for answering.\n\nUser Question:\n{query}\n\nAnswer:\n"
    )
}

pub struct Assistant {
    searcher: SemanticSearcher,
    generator: Arc<dyn AnswerGenerator>,
    k: usize,
    instructions: String,
}

impl Assistant {
    pub fn new(
        searcher: SemanticSearcher,
        generator: Arc<dyn AnswerGenerator>,
        k: usize,
        instructions: Option<String>,
    ) -> Self {
        Self {
            searcher,
            generator,
            k,
            instructions: instructions.unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
        }
    }

    pub fn searcher(&self) -> &SemanticSearcher {
        &self.searcher
    }

    /// Answer `query` from the indexed documents, citing sources.
    pub async fn chat(&self, query: &str) -> String {
        let result = match self.searcher.search(query, self.k).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "search failed");
                return format!("Error searching documents: {}", e);
            }
        };

        if result.is_empty() {
            return NO_DOCUMENTS_MESSAGE.to_string();
        }

        let context = build_context(&result);
        let sources = distinct_sources(&result);
        let prompt = build_prompt(&self.instructions, &context, query);
        tracing::debug!(chunks = result.len(), origin = ?result.origin, "generating answer");

        match self.generator.generate(&prompt).await {
            Ok(mut response) => {
                response.push_str("\n\nSources: ");
                response.push_str(&sources.join(", "));
                response
            }
            Err(e) => {
                tracing::warn!(error = %e, "generation failed");
                format!("Error generating response: {}", e)
            }
        }
    }
}
