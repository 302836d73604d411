//! Core types for embeddings

use deal_core::ItemMetadata;
use serde::{Deserialize, Serialize};

/// Embedding vector (dimension fixed per collection)
pub type EmbeddingVector = Vec<f32>;

/// A stored embedding with its source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier within the collection (`doc_{offset}`)
    pub id: String,
    pub embedding: EmbeddingVector,
    /// Text the embedding was computed from
    pub document: String,
    pub metadata: ItemMetadata,
}

/// Nearest-neighbour query result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub document: String,
    pub metadata: ItemMetadata,
    /// Cosine distance (0.0 = same direction, 2.0 = opposite)
    pub distance: f64,
}

impl EmbeddingRecord {
    pub fn new(id: impl Into<String>, embedding: EmbeddingVector, document: String, metadata: ItemMetadata) -> Self {
        Self {
            id: id.into(),
            embedding,
            document,
            metadata,
        }
    }

    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}
