//! LLM filter that turns raw listings into priced deals

use std::sync::Arc;

use deal_core::{Deal, ScrapedDeal};
use deal_pricing::{extract_json, ChatMessage, ChatModel, CompletionOptions};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::error::{Result, ScannerError};

pub const DEFAULT_MAX_DEALS: usize = 5;

fn system_prompt(max_deals: usize) -> String {
    format!(
        r#"You identify and summarize the {max_deals} most detailed deals from a list, by selecting deals that have the most detailed, high quality description and the most clear price.
Respond strictly in JSON with no explanation, using this format. You should provide the price as a number derived from the description. If the price of a deal isn't clear, do not include that deal in your response.
Most important is that you respond with the {max_deals} deals that have the most detailed product description with price. It's not important to mention the terms of the deal; most important is a thorough description of the product.
Be careful with products that are described as "$XXX off" or "reduced by $XXX" - this isn't the actual price of the product. Only respond with products when you are highly confident about the price.

{{"deals": [{{"product_description": "Your clearly expressed summary of the product in 4-5 sentences. Details of the item are much more important than why it's a good deal. Avoid mentioning discounts and coupons; focus on the item itself. There should be a paragraph of text for each item you choose.", "price": 99.99, "url": "the url as provided"}}]}}"#
    )
}

fn user_prompt(listings: &[ScrapedDeal], max_deals: usize) -> String {
    let body = listings
        .iter()
        .map(ScrapedDeal::describe)
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        r#"Respond with the most promising {max_deals} deals from this list, selecting those which have the most detailed, high quality product description and a clear price that is greater than 0.
Respond strictly in JSON, and only JSON. You should rephrase the description to be a summary of the product itself, not the terms of the deal.
Remember to respond with a short paragraph of text in the product_description field for each of the {max_deals} items that you select.
Be careful with products that are described as "$XXX off" or "reduced by $XXX" - this isn't the actual price of the product. Only respond with products when you are highly confident about the price.

Deals:

{body}

Strictly respond in JSON and include exactly {max_deals} deals, no more."#
    )
}

/// Picks the listings with the clearest absolute price
pub struct DealSelector {
    chat: Arc<dyn ChatModel>,
    max_deals: usize,
}

impl DealSelector {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self {
            chat,
            max_deals: DEFAULT_MAX_DEALS,
        }
    }

    pub fn with_max_deals(mut self, max_deals: usize) -> Self {
        self.max_deals = max_deals;
        self
    }

    /// Ask the model for the best priced deals among `listings`
    ///
    /// Entries without a positive price are dropped and the result is capped
    /// at `max_deals`.
    #[instrument(skip(self, listings), fields(listings = listings.len(), model = self.chat.model()))]
    pub async fn select(&self, listings: &[ScrapedDeal]) -> Result<Vec<Deal>> {
        if listings.is_empty() {
            return Ok(Vec::new());
        }

        let messages = vec![
            ChatMessage::system(system_prompt(self.max_deals)),
            ChatMessage::user(user_prompt(listings, self.max_deals)),
        ];
        let options = CompletionOptions {
            json: true,
            ..CompletionOptions::default()
        };

        let reply = self.chat.complete(&messages, &options).await?;
        let deals = parse_selection(&reply, self.max_deals)?;

        info!("Selected {} deals with a clear price", deals.len());
        Ok(deals)
    }
}

/// Deals from the model reply, keeping only well-formed entries
///
/// Entries missing a field, or without a positive price, are dropped one by
/// one; the rest is capped at `max_deals`.
fn parse_selection(reply: &str, max_deals: usize) -> Result<Vec<Deal>> {
    let json = extract_json(reply)
        .ok_or_else(|| ScannerError::ParseError(format!("No JSON in selection reply: {}", reply)))?;
    let value: Value = serde_json::from_str(json)
        .map_err(|e| ScannerError::ParseError(format!("Failed to parse selection: {}", e)))?;

    let entries = match value.get("deals") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries.clone(),
        Some(other) => {
            return Err(ScannerError::ParseError(format!("\"deals\" is not a list: {}", other)));
        }
    };

    let total = entries.len();
    let deals: Vec<Deal> = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Deal>(entry) {
            Ok(deal) => Some(deal),
            Err(e) => {
                debug!("Skipping malformed deal: {}", e);
                None
            }
        })
        .filter(|deal| deal.price.is_finite() && deal.price > 0.0 && !deal.url.trim().is_empty())
        .take(max_deals)
        .collect();

    if deals.len() < total {
        debug!("Dropped {} of {} selected deals", total - deals.len(), total);
    }
    Ok(deals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use deal_pricing::PricingError;
    use regex::Regex;

    fn listing(i: usize, text: &str) -> ScrapedDeal {
        ScrapedDeal {
            title: format!("Listing {i}"),
            summary: text.to_string(),
            details: String::new(),
            features: String::new(),
            url: format!("https://deals.test/{i}"),
            published_at: Utc::now(),
        }
    }

    /// Behaves like a careful model: prices listings with a "for $X" price,
    /// and reports discount-only listings with price 0
    struct CarefulModel;

    #[async_trait]
    impl ChatModel for CarefulModel {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            options: &CompletionOptions,
        ) -> deal_pricing::Result<String> {
            assert!(options.json);
            let prompt = &messages[1].content;
            let absolute = Regex::new(r"for \$(\d+)").unwrap();
            let url = Regex::new(r"URL: (\S+)").unwrap();

            let mut deals = Vec::new();
            for block in prompt.split("\n\n").filter(|b| b.starts_with("Title:")) {
                let Some(link) = url.captures(block) else { continue };
                let price = absolute
                    .captures(block)
                    .map(|c| c[1].parse::<f64>().unwrap())
                    .unwrap_or(0.0);
                deals.push(serde_json::json!({
                    "product_description": block.lines().next().unwrap(),
                    "price": price,
                    "url": &link[1],
                }));
            }
            Ok(format!("```json\n{}\n```", serde_json::json!({ "deals": deals })))
        }

        fn model(&self) -> &str {
            "careful"
        }
    }

    /// Replies with a fixed text and records the prompts it was sent
    struct CannedModel {
        reply: String,
        seen: std::sync::Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl CannedModel {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn complete(&self, messages: &[ChatMessage], _: &CompletionOptions) -> deal_pricing::Result<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.reply.clone())
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn complete(&self, _: &[ChatMessage], _: &CompletionOptions) -> deal_pricing::Result<String> {
            Err(PricingError::api("unavailable"))
        }

        fn model(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_discount_only_listings_never_selected() {
        let priced = [3, 11, 24, 37, 45];
        let listings: Vec<ScrapedDeal> = (0..50)
            .map(|i| {
                if priced.contains(&i) {
                    listing(i, &format!("Cordless vacuum for ${}", 100 + i))
                } else {
                    listing(i, &format!("Save ${} off a coffee maker, reduced by ${}", 20 + i, 20 + i))
                }
            })
            .collect();

        let deals = DealSelector::new(Arc::new(CarefulModel)).select(&listings).await.unwrap();

        assert_eq!(deals.len(), 5);
        for deal in &deals {
            let index: usize = deal.url.rsplit('/').next().unwrap().parse().unwrap();
            assert!(priced.contains(&index), "discount-only listing {index} selected");
            assert_eq!(deal.price, 100.0 + index as f64);
        }
    }

    #[test]
    fn test_parse_selection_filters_and_caps() {
        let reply = r#"{"deals": [
            {"product_description": "a", "price": 10.0, "url": "u1"},
            {"product_description": "b", "price": 0, "url": "u2"},
            {"product_description": "c", "price": -3, "url": "u3"},
            {"product_description": "d", "price": 5.5, "url": "u4"},
            {"product_description": "e", "price": 7, "url": "u5"}
        ]}"#;

        let deals = parse_selection(reply, 2).unwrap();

        assert_eq!(deals.iter().map(|d| d.url.as_str()).collect::<Vec<_>>(), vec!["u1", "u4"]);
    }

    #[tokio::test]
    async fn test_select_filters_malformed_and_caps() {
        let reply = r#"Sure! ```json
{"deals": [
    {"product_description": "Espresso machine", "price": 0, "url": "https://deals.test/0"},
    {"product_description": "Air fryer", "price": 79.99, "url": "https://deals.test/1"},
    {"product_description": "Smart bulb", "price": 12.5},
    {"product_description": "Monitor arm", "price": "cheap", "url": "https://deals.test/3"},
    {"product_description": "Robot vacuum", "price": 249.0, "url": "https://deals.test/4"},
    {"product_description": "Desk lamp", "price": 30, "url": "https://deals.test/5"},
    {"product_description": "Blender", "price": 45, "url": "https://deals.test/6"}
]}
```"#;
        let model = Arc::new(CannedModel::new(reply));
        let selector = DealSelector::new(model.clone()).with_max_deals(3);

        let listings: Vec<ScrapedDeal> = (0..7).map(|i| listing(i, "Kitchen gadget for $50")).collect();
        let deals = selector.select(&listings).await.unwrap();

        let urls: Vec<&str> = deals.iter().map(|d| d.url.as_str()).collect();
        assert_eq!(urls, vec!["https://deals.test/1", "https://deals.test/4", "https://deals.test/5"]);
        assert_eq!(deals[0].price, 79.99);

        let seen = model.seen.lock().unwrap();
        assert!(seen[0][0].content.contains("the 3 most detailed deals"));
        assert!(seen[0][1].content.ends_with("include exactly 3 deals, no more."));
        assert!(seen[0][1].content.contains("URL: https://deals.test/6"));
    }

    #[test]
    fn test_parse_selection_without_deals_is_empty() {
        assert!(parse_selection("{}", 5).unwrap().is_empty());
        assert!(matches!(parse_selection(r#"{"deals": 3}"#, 5), Err(ScannerError::ParseError(_))));
    }

    #[test]
    fn test_parse_selection_rejects_non_json() {
        assert!(matches!(parse_selection("no deals today", 5), Err(ScannerError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_model_failure_surfaces() {
        let selector = DealSelector::new(Arc::new(FailingModel));
        let err = selector.select(&[listing(0, "for $5")]).await.unwrap_err();
        assert!(matches!(err, ScannerError::Selection(_)));
    }

    #[tokio::test]
    async fn test_empty_listings_skip_model() {
        let selector = DealSelector::new(Arc::new(FailingModel));
        assert!(selector.select(&[]).await.unwrap().is_empty());
    }
}
