//! Opportunity services for the Deal Hunter
//!
//! This crate ties the scanner and the estimators together: it plans scan
//! cycles, remembers surfaced opportunities and sends notifications.

pub mod bootstrap;
pub mod deal_service;
pub mod memory;
pub mod notifier;
pub mod planner;

pub use deal_service::DealService;
pub use memory::OpportunityMemory;
pub use notifier::{Notifier, PushoverNotifier};
pub use planner::{DealSource, Planner, PriceEstimator};
