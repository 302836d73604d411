//! Embeddings and Vector Retrieval for Product Items
//!
//! This crate provides semantic retrieval of similar products for the
//! retrieval-augmented price estimator.
//!
//! ## Features
//! - Generate embeddings through any OpenAI-compatible `/embeddings` endpoint
//! - Rank stored vectors by cosine distance to a query
//! - Store (id, vector, document, metadata) records in named SQLite collections
//! - Answer deterministic top-k nearest-neighbour queries
//! - Build a collection from a batch of curated items

pub mod client;
pub mod error;
pub mod index;
mod similarity;
pub mod store;
pub mod types;

pub use client::{EmbeddingClient, TextEncoder};
pub use error::{EmbeddingError, Result};
pub use index::build_index;
pub use store::{StoreStats, VectorStore};
pub use types::{EmbeddingRecord, EmbeddingVector, QueryMatch};
