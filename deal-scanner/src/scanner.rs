//! Feed fetch plus model selection

use std::collections::HashSet;

use deal_core::DealSelection;
use tracing::{info, instrument};

use crate::error::Result;
use crate::rss_client::{RssClient, DEFAULT_PER_FEED};
use crate::selector::DealSelector;

/// Finds new, clearly priced deals
pub struct DealScanner {
    rss: RssClient,
    selector: DealSelector,
    per_feed: usize,
}

impl DealScanner {
    pub fn new(rss: RssClient, selector: DealSelector) -> Self {
        Self {
            rss,
            selector,
            per_feed: DEFAULT_PER_FEED,
        }
    }

    pub fn with_per_feed(mut self, per_feed: usize) -> Self {
        self.per_feed = per_feed;
        self
    }

    /// Scan the feeds, skipping listings in `seen_urls`
    ///
    /// Returns `None` when no new listing yielded a priced deal.
    #[instrument(skip(self, seen_urls), fields(seen = seen_urls.len()))]
    pub async fn scan(&self, seen_urls: &HashSet<String>) -> Result<Option<DealSelection>> {
        let listings = self.rss.fetch_deals(self.per_feed, seen_urls).await;
        if listings.is_empty() {
            info!("No new listings");
            return Ok(None);
        }

        let deals = self.selector.select(&listings).await?;
        if deals.is_empty() {
            info!("No listing had a clear price");
            return Ok(None);
        }

        Ok(Some(DealSelection { deals }))
    }
}
