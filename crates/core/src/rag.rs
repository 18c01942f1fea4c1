use crate::completion::CompletionProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use vertexops_common::{Result, VertexError};
use vertexops_knowledge::{SearchHit, VectorStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub response_text: String,
    pub source_docs: Vec<SearchHit>,
    pub confidence_score: f32,
}

/// Retrieves context from the vector store and phrases an answer, either
/// through the completion provider or with a local template.
pub struct RagService {
    store: Arc<VectorStore>,
    completion: Option<Arc<dyn CompletionProvider>>,
    fallback_snippets: usize,
}

impl RagService {
    pub fn new(
        store: Arc<VectorStore>,
        completion: Option<Arc<dyn CompletionProvider>>,
        fallback_snippets: usize,
    ) -> Self {
        Self {
            store,
            completion,
            fallback_snippets,
        }
    }

    /// `context_sources`, when non-empty, limits retrieval to those record ids.
    #[instrument(skip(self, context_sources))]
    pub async fn generate_response(
        &self,
        query: &str,
        top_k: usize,
        context_sources: &[String],
    ) -> Result<RagAnswer> {
        if query.trim().is_empty() {
            return Err(VertexError::Validation("query must not be empty".to_string()));
        }

        let query_embedding = self.store.embed(query);
        let hits = if context_sources.is_empty() {
            self.store.search(&query_embedding, top_k)?
        } else {
            let allowed: HashSet<&str> = context_sources.iter().map(String::as_str).collect();
            self.store
                .search_filtered(&query_embedding, top_k, |record| allowed.contains(record.id.as_str()))?
        };
        debug!("Retrieved {} context documents", hits.len());

        let texts: Vec<&str> = hits.iter().map(|hit| hit.text.as_str()).collect();
        let response_text = match self.complete_remotely(query, &texts).await {
            Some(text) => text,
            None => self.fallback_answer(query, &texts),
        };

        let confidence_score = if hits.is_empty() {
            0.0
        } else {
            hits.iter().map(|hit| hit.score).sum::<f32>() / hits.len() as f32
        };

        Ok(RagAnswer {
            response_text,
            source_docs: hits,
            confidence_score,
        })
    }

    async fn complete_remotely(&self, query: &str, texts: &[&str]) -> Option<String> {
        let provider = self.completion.as_ref()?;
        let prompt = build_prompt(query, texts);

        match provider.complete(&prompt).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Completion failed, using local answer: {}", e);
                None
            }
        }
    }

    fn fallback_answer(&self, query: &str, texts: &[&str]) -> String {
        let snippets = texts
            .iter()
            .take(self.fallback_snippets)
            .copied()
            .collect::<Vec<_>>()
            .join("\n---\n");

        format!(
            "[SIMULATED LLM ANSWER]\nQuery: {}\nContext snippets:\n{}",
            query, snippets
        )
    }
}

fn build_prompt(query: &str, texts: &[&str]) -> String {
    format!(
        "Use the following context to answer the query.\nContext:\n{}\n\nQuery: {}\n\nAnswer:",
        texts.join("\n\n"),
        query
    )
}
