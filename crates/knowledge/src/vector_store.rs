use crate::embedding::{cosine_similarity, text_to_embedding, EMBED_DIM};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use vertexops_common::{Metadata, Result, VertexError};

/// One stored item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

/// Input for [`VectorStore::add_record`] and [`VectorStore::bulk_add`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRecord {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl NewRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// A search result. The stored vector is deliberately not exposed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub score: f32,
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
}

/// Append-only, linear-scan vector index.
///
/// Every operation takes the same lock for its whole duration, so adds and
/// searches are linearized. Identifiers are not required to be unique.
#[derive(Debug)]
pub struct VectorStore {
    dimension: usize,
    records: Mutex<Vec<VectorRecord>>,
}

impl Default for VectorStore {
    fn default() -> Self {
        Self::new(EMBED_DIM)
    }
}

impl VectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Embeds `text` with the store's dimension.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        text_to_embedding(text, self.dimension)
    }

    pub fn add(
        &self,
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: Option<Metadata>,
        embedding: Option<Vec<f32>>,
    ) -> Result<VectorRecord> {
        self.add_record(NewRecord {
            id: id.into(),
            text: text.into(),
            metadata,
            embedding,
        })
    }

    pub fn add_record(&self, item: NewRecord) -> Result<VectorRecord> {
        let record = self.prepare(item)?;

        let mut records = self.lock();
        records.push(record.clone());
        debug!(id = %record.id, total = records.len(), "Added vector record");

        Ok(record)
    }

    /// Appends all items in a single critical section. Items are validated
    /// up front, so either the whole batch lands or none of it does.
    pub fn bulk_add(&self, items: Vec<NewRecord>) -> Result<Vec<VectorRecord>> {
        let prepared = items
            .into_iter()
            .map(|item| self.prepare(item))
            .collect::<Result<Vec<_>>>()?;

        let mut records = self.lock();
        records.extend(prepared.iter().cloned());
        debug!(added = prepared.len(), total = records.len(), "Bulk added vector records");

        Ok(prepared)
    }

    /// Top-`top_k` records by cosine similarity, highest first. Equal scores
    /// keep insertion order.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        self.search_filtered(query, top_k, |_| true)
    }

    /// Like [`search`](Self::search) but only records accepted by `filter`
    /// are ranked.
    pub fn search_filtered<F>(&self, query: &[f32], top_k: usize, filter: F) -> Result<Vec<SearchHit>>
    where
        F: Fn(&VectorRecord) -> bool,
    {
        let records = self.lock();
        if records.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimension(query.len())?;

        let mut scored: Vec<(f32, &VectorRecord)> = records
            .iter()
            .filter(|record| filter(record))
            .map(|record| (cosine_similarity(query, &record.embedding), record))
            .collect();

        // stable sort keeps insertion order for ties
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, record)| SearchHit {
                score,
                id: record.id.clone(),
                text: record.text.clone(),
                metadata: record.metadata.clone(),
            })
            .collect())
    }

    fn prepare(&self, item: NewRecord) -> Result<VectorRecord> {
        let embedding = match item.embedding {
            Some(embedding) => {
                self.check_dimension(embedding.len())?;
                embedding
            }
            None => self.embed(&item.text),
        };

        Ok(VectorRecord {
            id: item.id,
            text: item.text,
            metadata: item.metadata.unwrap_or_default(),
            embedding,
        })
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.dimension {
            return Err(VertexError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<VectorRecord>> {
        // records are only ever appended, so a panicked holder cannot leave
        // them half-written
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
