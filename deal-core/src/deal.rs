//! Deal listings and the opportunities derived from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A listing scraped from a deal feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedDeal {
    /// Listing title
    pub title: String,
    /// Plain-text summary from the feed entry
    pub summary: String,
    /// Details section of the listing page (if fetched)
    pub details: String,
    /// Features section of the listing page (if fetched)
    pub features: String,
    /// Listing URL
    pub url: String,
    /// Publication date
    pub published_at: DateTime<Utc>,
}

impl ScrapedDeal {
    /// Text block describing this listing for the selection model
    pub fn describe(&self) -> String {
        let details = if self.details.trim().is_empty() {
            self.summary.trim()
        } else {
            self.details.trim()
        };
        format!(
            "Title: {}\nDetails: {}\nFeatures: {}\nURL: {}",
            self.title,
            details,
            self.features.trim(),
            self.url
        )
    }
}

/// A deal selected by the language model, with an absolute price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    /// Summary of the product itself (not the terms of the deal)
    pub product_description: String,
    /// Listed price in dollars
    pub price: f64,
    /// Listing URL
    pub url: String,
}

/// Structured response of the deal selection model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealSelection {
    #[serde(default)]
    pub deals: Vec<Deal>,
}

/// A deal paired with the estimated true value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub deal: Deal,
    /// Ensemble estimate of the true price
    pub estimate: f64,
    /// estimate - listed price; negative when the listing is overpriced
    pub discount: f64,
}

impl Opportunity {
    pub fn new(deal: Deal, estimate: f64) -> Self {
        let discount = estimate - deal.price;
        Self {
            deal,
            estimate,
            discount,
        }
    }

    /// Whether the discount clears the given threshold
    pub fn is_actionable(&self, threshold: f64) -> bool {
        self.discount > threshold
    }

    /// Row shown in the opportunity table
    pub fn row(&self) -> OpportunityRow {
        OpportunityRow {
            description: self.deal.product_description.clone(),
            price: self.deal.price,
            estimate: self.estimate,
            discount: self.discount,
            url: self.deal.url.clone(),
        }
    }

    /// Push notification text for this opportunity
    pub fn alert_message(&self) -> String {
        let teaser: String = self.deal.product_description.chars().take(10).collect();
        format!(
            "Deal Alert! Price=${:.2}, Estimate=${:.2}, Discount=${:.2} :{}... {}",
            self.deal.price, self.estimate, self.discount, teaser, self.deal.url
        )
    }
}

/// Flat table row for the operator UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityRow {
    pub description: String,
    pub price: f64,
    pub estimate: f64,
    pub discount: f64,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deal(price: f64) -> Deal {
        Deal {
            product_description: "Robot vacuum with LiDAR mapping".to_string(),
            price,
            url: "https://example.com/deal".to_string(),
        }
    }

    #[test]
    fn test_discount_can_be_negative() {
        let opportunity = Opportunity::new(deal(300.0), 250.0);
        assert_eq!(opportunity.discount, -50.0);
        assert!(!opportunity.is_actionable(0.0));
    }

    #[test]
    fn test_actionable_threshold_is_strict() {
        let opportunity = Opportunity::new(deal(100.0), 150.0);
        assert!(!opportunity.is_actionable(50.0));
        assert!(opportunity.is_actionable(49.99));
    }

    #[test]
    fn test_alert_message() {
        let message = Opportunity::new(deal(100.0), 180.0).alert_message();
        assert!(message.starts_with("Deal Alert! Price=$100.00, Estimate=$180.00, Discount=$80.00"));
        assert!(message.contains("Robot vacu..."));
        assert!(message.ends_with("https://example.com/deal"));
    }

    #[test]
    fn test_selection_parses_contract() {
        let json = r#"{"deals": [{"product_description": "A lamp", "price": 19.99, "url": "https://x"}]}"#;
        let selection: DealSelection = serde_json::from_str(json).unwrap();
        assert_eq!(selection.deals.len(), 1);
        assert_eq!(selection.deals[0].price, 19.99);
    }
}
