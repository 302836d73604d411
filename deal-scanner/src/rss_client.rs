//! RSS Feed Client for deal listings
//!
//! Fetches and parses RSS/Atom deal feeds and, optionally, the listing page
//! behind each entry for its details and features.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use deal_core::ScrapedDeal;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, ScannerError};
use crate::feeds::{curated_feeds, DealFeed};

pub const DEFAULT_PER_FEED: usize = 10;

/// Feed entry before the listing page is fetched
#[derive(Debug, Clone)]
struct FeedEntry {
    title: String,
    summary: String,
    url: String,
    published_at: DateTime<Utc>,
}

/// RSS feed client
pub struct RssClient {
    client: Client,
    feeds: Vec<DealFeed>,
    fetch_listings: bool,
}

impl RssClient {
    /// Create a new RSS client with the curated feeds
    pub fn new() -> Self {
        Self::with_feeds(curated_feeds())
    }

    /// Create with custom feeds
    pub fn with_feeds(feeds: Vec<DealFeed>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            feeds,
            fetch_listings: true,
        }
    }

    /// Skip fetching listing pages; use feed summaries only
    pub fn without_listing_pages(mut self) -> Self {
        self.fetch_listings = false;
        self
    }

    pub fn feeds(&self) -> &[DealFeed] {
        &self.feeds
    }

    /// Fetch up to `per_feed` new listings from every feed
    ///
    /// Listings whose URL is in `seen` or already taken from an earlier feed
    /// are dropped. A feed that fails is logged and skipped.
    #[instrument(skip(self, seen))]
    pub async fn fetch_deals(&self, per_feed: usize, seen: &HashSet<String>) -> Vec<ScrapedDeal> {
        let mut taken: HashSet<String> = HashSet::new();
        let mut deals = Vec::new();

        for feed in &self.feeds {
            let entries = match self.fetch_feed(feed).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Failed to fetch feed {}: {}", feed.name, e);
                    continue;
                }
            };
            debug!("Fetched {} entries from {}", entries.len(), feed.name);

            for entry in entries.into_iter().take(per_feed) {
                if seen.contains(&entry.url) || !taken.insert(entry.url.clone()) {
                    continue;
                }
                deals.push(self.complete(entry).await);
            }
        }

        info!("Fetched {} new deals from RSS feeds", deals.len());
        deals
    }

    /// Attach listing-page details to a feed entry
    async fn complete(&self, entry: FeedEntry) -> ScrapedDeal {
        let (details, features) = if self.fetch_listings {
            match self.fetch_listing(&entry.url).await {
                Ok(sections) => sections,
                Err(e) => {
                    debug!("Listing page unavailable for {}: {}", entry.url, e);
                    (String::new(), String::new())
                }
            }
        } else {
            (String::new(), String::new())
        };

        ScrapedDeal {
            title: entry.title,
            summary: entry.summary,
            details,
            features,
            url: entry.url,
            published_at: entry.published_at,
        }
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", "DealHunter/1.0")
            .send()
            .await
            .map_err(|e| ScannerError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScannerError::ApiError {
                status: response.status().as_u16(),
                message: format!("Failed to fetch {}", url),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ScannerError::RequestFailed(e.to_string()))
    }

    /// Fetch a single feed, in feed order
    async fn fetch_feed(&self, feed: &DealFeed) -> Result<Vec<FeedEntry>> {
        let content = self.get_text(&feed.url).await?;
        parse_feed(content.as_bytes())
            .ok_or_else(|| ScannerError::ParseError(format!("Failed to parse feed: {}", feed.url)))
    }

    /// Details and features sections of a listing page
    async fn fetch_listing(&self, url: &str) -> Result<(String, String)> {
        let html = self.get_text(url).await?;
        extract_listing_sections(&html)
            .ok_or_else(|| ScannerError::ParseError(format!("No content section in {}", url)))
    }
}

impl Default for RssClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse RSS, falling back to Atom
fn parse_feed(content: &[u8]) -> Option<Vec<FeedEntry>> {
    if let Ok(channel) = rss::Channel::read_from(content) {
        return Some(parse_rss_channel(&channel));
    }

    if let Ok(atom_feed) = atom_syndication::Feed::read_from(content) {
        return Some(parse_atom_feed(&atom_feed));
    }

    None
}

fn parse_rss_channel(channel: &rss::Channel) -> Vec<FeedEntry> {
    channel
        .items()
        .iter()
        .filter_map(|item| {
            let title = item.title()?.to_string();
            let url = item.link()?.to_string();

            let published_at = item
                .pub_date()
                .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);

            let summary = strip_html(item.description().unwrap_or_default());

            Some(FeedEntry {
                title,
                summary,
                url,
                published_at,
            })
        })
        .collect()
}

fn parse_atom_feed(atom_feed: &atom_syndication::Feed) -> Vec<FeedEntry> {
    atom_feed
        .entries()
        .iter()
        .filter_map(|entry| {
            let url = entry.links().first().map(|l| l.href().to_string())?;
            if url.is_empty() {
                return None;
            }

            let published_at = entry
                .published()
                .unwrap_or_else(|| entry.updated())
                .with_timezone(&Utc);

            let summary_html = entry.summary().map(|s| s.as_str()).unwrap_or_default();
            let content_html = entry.content().and_then(|c| c.value()).unwrap_or_default();
            let summary = if !summary_html.is_empty() {
                strip_html(summary_html)
            } else {
                strip_html(content_html)
            };

            Some(FeedEntry {
                title: entry.title().to_string(),
                summary,
                url,
                published_at,
            })
        })
        .collect()
}

/// Text of `div.content-section`, split into (details, features)
fn extract_listing_sections(html: &str) -> Option<(String, String)> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("div.content-section").ok()?;
    let section = document.select(&selector).next()?;

    let text = section.text().collect::<Vec<_>>().join("\n").replace("\nmore", "");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    Some(match text.split_once("Features") {
        Some((details, features)) => (details.trim().to_string(), features.trim().to_string()),
        None => (text, String::new()),
    })
}

/// Strip HTML tags from text
fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    // Clean up whitespace and HTML entities
    result
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
