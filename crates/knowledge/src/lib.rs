//! Pseudo-embeddings and the in-memory vector index

pub mod embedding;
pub mod vector_store;

pub use embedding::{cosine_similarity, embed, text_to_embedding, EMBED_DIM};
pub use vector_store::{NewRecord, SearchHit, VectorRecord, VectorStore};
