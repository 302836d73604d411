//! Price Estimation for Product Descriptions
//!
//! This crate provides the estimators behind the Deal Hunter: a
//! retrieval-augmented frontier LLM, a hosted specialist model, a random
//! forest over embeddings, and a linear ensemble that combines them.

pub mod ensemble;
pub mod error;
pub mod evaluation;
pub mod forest;
pub mod frontier;
pub mod linear;
pub mod llm;
pub mod parse;
pub mod pricer;
pub mod retry;
pub mod specialist;

pub use ensemble::{EnsembleEstimate, EnsembleModel, EnsemblePricer};
pub use error::{PricingError, Result};
pub use evaluation::{evaluate, Band, EvaluationReport, Scored};
pub use forest::{ForestConfig, ForestPricer, RandomForest};
pub use frontier::{FrontierPricer, FrontierProvider};
pub use linear::LinearRegression;
pub use llm::{extract_json, ChatMessage, ChatModel, ChatRole, CompletionOptions, OpenAiChat};
pub use parse::parse_price;
pub use pricer::Pricer;
pub use retry::{with_retry, RetryPolicy};
pub use specialist::SpecialistPricer;
