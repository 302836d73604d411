//! Turning scanned deals into opportunities

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use deal_core::{DealError, DealResult, DealSelection, Opportunity};
use deal_pricing::EnsemblePricer;
use deal_scanner::DealScanner;
use tracing::{info, instrument, warn};

use crate::memory::OpportunityMemory;
use crate::notifier::Notifier;

pub const DEFAULT_MAX_DEALS: usize = 5;

/// Source of freshly selected deals
#[async_trait]
pub trait DealSource: Send + Sync {
    async fn scan(&self, seen_urls: &HashSet<String>) -> DealResult<Option<DealSelection>>;
}

/// Estimates the true price of a product description
#[async_trait]
pub trait PriceEstimator: Send + Sync {
    async fn estimate(&self, description: &str) -> DealResult<f64>;
}

#[async_trait]
impl DealSource for DealScanner {
    async fn scan(&self, seen_urls: &HashSet<String>) -> DealResult<Option<DealSelection>> {
        DealScanner::scan(self, seen_urls)
            .await
            .map_err(|e| DealError::api(format!("Deal scan failed: {}", e)))
    }
}

#[async_trait]
impl PriceEstimator for EnsemblePricer {
    async fn estimate(&self, description: &str) -> DealResult<f64> {
        self.price(description)
            .await
            .map_err(|e| DealError::api(format!("Estimate failed: {}", e)))
    }
}

/// Scans, prices and picks the best opportunity of a cycle
pub struct Planner {
    source: Arc<dyn DealSource>,
    estimator: Arc<dyn PriceEstimator>,
    notifier: Notifier,
    threshold: f64,
    max_deals: usize,
}

impl Planner {
    pub fn new(
        source: Arc<dyn DealSource>,
        estimator: Arc<dyn PriceEstimator>,
        notifier: Notifier,
        threshold: f64,
    ) -> Self {
        Self {
            source,
            estimator,
            notifier,
            threshold,
            max_deals: DEFAULT_MAX_DEALS,
        }
    }

    pub fn with_max_deals(mut self, max_deals: usize) -> Self {
        self.max_deals = max_deals;
        self
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn estimator(&self) -> &Arc<dyn PriceEstimator> {
        &self.estimator
    }

    /// Price every selected deal
    ///
    /// Deals whose estimate fails are skipped. The result is sorted by
    /// discount, largest first.
    pub async fn evaluate(&self, selection: DealSelection) -> Vec<Opportunity> {
        let mut opportunities = Vec::new();
        for deal in selection.deals.into_iter().take(self.max_deals) {
            match self.estimator.estimate(&deal.product_description).await {
                Ok(estimate) => {
                    info!(url = %deal.url, price = deal.price, estimate, "Priced deal");
                    opportunities.push(Opportunity::new(deal, estimate));
                }
                Err(e) => warn!(url = %deal.url, "Skipping deal: {}", e),
            }
        }
        opportunities.sort_by(|a, b| b.discount.total_cmp(&a.discount));
        opportunities
    }

    /// Run one cycle; notify and return the best deal if it clears the threshold
    #[instrument(skip(self, memory), fields(threshold = self.threshold))]
    pub async fn plan(&self, memory: &OpportunityMemory) -> DealResult<Option<Opportunity>> {
        let Some(selection) = self.source.scan(&memory.seen_urls()).await? else {
            info!("No new deals this cycle");
            return Ok(None);
        };

        let Some(best) = self.evaluate(selection).await.into_iter().next() else {
            return Ok(None);
        };

        if !best.is_actionable(self.threshold) {
            info!(discount = best.discount, "Best deal below threshold");
            return Ok(None);
        }

        self.notifier.alert(&best).await;
        Ok(Some(best))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use deal_core::Deal;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Returns a fixed selection minus anything already seen
    pub struct FixedSource {
        pub deals: Vec<Deal>,
        pub seen_calls: Mutex<Vec<HashSet<String>>>,
    }

    impl FixedSource {
        pub fn new(deals: Vec<Deal>) -> Self {
            Self {
                deals,
                seen_calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DealSource for FixedSource {
        async fn scan(&self, seen_urls: &HashSet<String>) -> DealResult<Option<DealSelection>> {
            self.seen_calls.lock().unwrap().push(seen_urls.clone());
            let deals: Vec<Deal> = self
                .deals
                .iter()
                .filter(|d| !seen_urls.contains(&d.url))
                .cloned()
                .collect();
            Ok((!deals.is_empty()).then_some(DealSelection { deals }))
        }
    }

    /// Looks estimates up by description; unknown descriptions fail
    pub struct TableEstimator(pub HashMap<String, f64>);

    #[async_trait]
    impl PriceEstimator for TableEstimator {
        async fn estimate(&self, description: &str) -> DealResult<f64> {
            self.0
                .get(description)
                .copied()
                .ok_or_else(|| DealError::api("no estimate"))
        }
    }

    pub fn deal(name: &str, price: f64) -> Deal {
        Deal {
            product_description: name.to_string(),
            price,
            url: format!("https://deals.test/{}", name),
        }
    }

    pub fn estimator(pairs: &[(&str, f64)]) -> Arc<TableEstimator> {
        Arc::new(TableEstimator(
            pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        ))
    }

    #[tokio::test]
    async fn test_picks_largest_discount() {
        let source = Arc::new(FixedSource::new(vec![
            deal("blender", 50.0),
            deal("tv", 400.0),
            deal("mystery", 10.0),
        ]));
        let planner = Planner::new(
            source,
            estimator(&[("blender", 90.0), ("tv", 520.0)]),
            Notifier::Log,
            50.0,
        );

        let best = planner.plan(&OpportunityMemory::new()).await.unwrap().unwrap();

        assert_eq!(best.deal.product_description, "tv");
        assert_eq!(best.discount, 120.0);
    }

    #[tokio::test]
    async fn test_threshold_blocks_small_discounts() {
        let source = Arc::new(FixedSource::new(vec![deal("blender", 50.0)]));
        let planner = Planner::new(source, estimator(&[("blender", 100.0)]), Notifier::Log, 50.0);

        assert!(planner.plan(&OpportunityMemory::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_only_first_deals_are_priced() {
        let source = Arc::new(FixedSource::new(vec![
            deal("a", 10.0),
            deal("b", 10.0),
            deal("c", 10.0),
        ]));
        let planner = Planner::new(
            source,
            estimator(&[("a", 20.0), ("b", 30.0), ("c", 500.0)]),
            Notifier::Log,
            5.0,
        )
        .with_max_deals(2);

        let best = planner.plan(&OpportunityMemory::new()).await.unwrap().unwrap();

        assert_eq!(best.deal.product_description, "b");
    }

    #[tokio::test]
    async fn test_passes_seen_urls_to_source() {
        let source = Arc::new(FixedSource::new(vec![deal("a", 10.0)]));
        let planner = Planner::new(source.clone(), estimator(&[("a", 100.0)]), Notifier::Log, 50.0);
        let mut memory = OpportunityMemory::new();
        memory.push(Opportunity::new(deal("a", 10.0), 100.0));

        assert!(planner.plan(&memory).await.unwrap().is_none());
        assert!(source.seen_calls.lock().unwrap()[0].contains("https://deals.test/a"));
    }
}
