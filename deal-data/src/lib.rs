//! Dataset curation for the Deal Hunter
//!
//! Turns raw product dumps into balanced, normalized item batches:
//! - `item`: raw record parsing, scrubbing and prompt construction
//! - `tokenizer`: token counting and head-preserving truncation
//! - `loader`: JSONL ingestion with per-file reports
//! - `balancer`: price/category rebalancing and train/test split
//! - `batch`: binary persistence of item batches

pub mod balancer;
pub mod batch;
pub mod error;
pub mod item;
pub mod loader;
pub mod tokenizer;

pub use balancer::{balance, BalanceConfig, BalanceReport, BalancedDataset, SlotReport};
pub use batch::{load_items, save_items};
pub use error::{DataError, Result};
pub use item::{parse_price, ItemConfig, ItemNormalizer, RawProduct};
pub use loader::{load_jsonl, LoadReport};
pub use tokenizer::Tokenizer;
