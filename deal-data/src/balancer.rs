//! Price and category rebalancing
//!
//! Raw dumps are dominated by cheap items and by a few large categories.
//! Items are bucketed into whole-dollar slots; crowded cheap slots are
//! down-sampled with weights that favour under-represented categories.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, instrument};

use deal_core::Item;

use crate::error::{DataError, Result};

/// Balancing parameters
#[derive(Debug, Clone)]
pub struct BalanceConfig {
    /// Slots at or above this price are always kept whole
    pub plateau_threshold: u32,
    /// Maximum items kept in a slot below the threshold
    pub slot_cap: usize,
    /// Category that dominates the raw data
    pub dominant_category: String,
    /// Sampling weight of any other category (the dominant one weighs 1)
    pub non_dominant_weight: f64,
    pub seed: u64,
    pub train_size: usize,
    pub test_size: usize,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            plateau_threshold: 240,
            slot_cap: 1200,
            dominant_category: "Automotive".to_string(),
            non_dominant_weight: 5.0,
            seed: 42,
            train_size: 400_000,
            test_size: 2_000,
        }
    }
}

/// Slot occupancy before and after sampling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotReport {
    pub price: u32,
    pub before: usize,
    pub after: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BalanceReport {
    pub slots: Vec<SlotReport>,
    pub total_before: usize,
    pub total_after: usize,
}

/// Balanced, shuffled and split dataset
#[derive(Debug, Clone)]
pub struct BalancedDataset {
    pub train: Vec<Item>,
    pub test: Vec<Item>,
    pub report: BalanceReport,
}

/// Rebalance `items` and split them into train and test batches
#[instrument(skip(items, config), fields(items = items.len()))]
pub fn balance(items: Vec<Item>, config: &BalanceConfig) -> Result<BalancedDataset> {
    if config.non_dominant_weight <= 0.0 {
        return Err(DataError::Config(
            "non_dominant_weight must be positive".to_string(),
        ));
    }

    let total_before = items.len();
    let mut slots: BTreeMap<u32, Vec<Item>> = BTreeMap::new();
    for item in items {
        let slot = item.price.round().max(0.0) as u32;
        slots.entry(slot).or_default().push(item);
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut sample = Vec::with_capacity(total_before);
    let mut report = BalanceReport {
        total_before,
        ..BalanceReport::default()
    };

    for (price, slot) in slots {
        let before = slot.len();
        let start = sample.len();
        if price >= config.plateau_threshold || slot.len() <= config.slot_cap {
            sample.extend(slot);
        } else {
            let chosen: Vec<Item> = slot
                .choose_multiple_weighted(&mut rng, config.slot_cap, |item| {
                    if item.category == config.dominant_category {
                        1.0
                    } else {
                        config.non_dominant_weight
                    }
                })
                .map_err(|e| DataError::Sampling(format!("slot ${}: {}", price, e)))?
                .cloned()
                .collect();
            debug!("Slot ${}: sampled {} of {}", price, chosen.len(), before);
            sample.extend(chosen);
        }
        report.slots.push(SlotReport {
            price,
            before,
            after: sample.len() - start,
        });
    }
    report.total_after = sample.len();

    let mut shuffle_rng = StdRng::seed_from_u64(config.seed);
    sample.shuffle(&mut shuffle_rng);

    let train_len = config.train_size.min(sample.len());
    let mut train = sample;
    let mut test = train.split_off(train_len);
    test.truncate(config.test_size);

    info!(
        "Balanced {} items into {} (train {}, test {})",
        total_before,
        report.total_after,
        train.len(),
        test.len()
    );

    Ok(BalancedDataset {
        train,
        test,
        report,
    })
}
