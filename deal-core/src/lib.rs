//! Core types for the Deal Hunter
//!
//! This crate defines the shared data structures used across the pipeline,
//! including curated items, scraped deals, opportunities, predictor kinds and
//! the explicit runtime configuration.

pub mod config;
pub mod deal;
pub mod error;
pub mod item;
pub mod predictor;

pub use config::{
    ChatSettings, DealConfig, EmbeddingSettings, PipelineSettings, PushoverSettings,
    SpecialistSettings, StoreSettings,
};
pub use deal::{Deal, DealSelection, Opportunity, OpportunityRow, ScrapedDeal};
pub use error::{DealError, DealResult};
pub use item::{Item, ItemMetadata};
pub use predictor::PredictorKind;
