//! Deal discovery for the Deal Hunter
//!
//! This crate finds candidate deals:
//! - RSS feeds: curated DealNews category feeds, with listing-page details
//! - Selection: a chat model picks the listings with a clear absolute price

pub mod error;
pub mod feeds;
pub mod rss_client;
pub mod scanner;
pub mod selector;

pub use error::{Result, ScannerError};
pub use feeds::{curated_feeds, DealFeed};
pub use rss_client::{RssClient, DEFAULT_PER_FEED};
pub use scanner::DealScanner;
pub use selector::{DealSelector, DEFAULT_MAX_DEALS};
