//! Curated product items used for training, retrieval and evaluation

use serde::{Deserialize, Serialize};

/// Question that opens every item prompt
pub const QUESTION: &str = "How much does this cost to the nearest dollar?";

/// Prefix that precedes the price answer in a prompt
pub const PRICE_PREFIX: &str = "Price is $";

/// A curated product with its normalized prompt
///
/// Items are produced by the normalizer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Product title as found in the source record
    pub title: String,
    /// Price in dollars, within the plausible range
    pub price: f64,
    /// Category label (e.g. "Automotive", "Electronics")
    pub category: String,
    /// Full training prompt, including the price answer
    pub prompt: String,
    /// Number of tokens in the full prompt
    pub token_count: usize,
}

/// Metadata stored next to every item embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub category: String,
    pub price: f64,
}

impl Item {
    /// Build an item from its normalized body text
    ///
    /// The prompt ends with the rounded price so a model learns to
    /// complete `Price is $` with whole dollars.
    pub fn from_text(title: String, category: String, price: f64, text: &str, token_count: usize) -> Self {
        Self {
            title,
            price,
            category,
            prompt: make_prompt(text, price),
            token_count,
        }
    }

    /// Prompt shown at inference time, without the price answer
    pub fn test_prompt(&self) -> String {
        let head = self
            .prompt
            .split(PRICE_PREFIX)
            .next()
            .unwrap_or(&self.prompt);
        format!("{}{}", head, PRICE_PREFIX)
    }

    /// Product description without the question header or the price
    ///
    /// This is the text stored in the vector store and sent to predictors.
    pub fn description(&self) -> String {
        let header = format!("{}\n\n", QUESTION);
        let text = self.prompt.strip_prefix(&header).unwrap_or(&self.prompt);
        let suffix = format!("\n\n{}", PRICE_PREFIX);
        text.split(&suffix).next().unwrap_or(text).to_string()
    }

    /// Metadata stored with the item embedding
    pub fn metadata(&self) -> ItemMetadata {
        ItemMetadata {
            category: self.category.clone(),
            price: self.price,
        }
    }
}

/// Build the training prompt for a normalized body text
pub fn make_prompt(text: &str, price: f64) -> String {
    format!(
        "{}\n\n{}\n\n{}{}.00",
        QUESTION,
        text,
        PRICE_PREFIX,
        price.round() as i64
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Item {
        Item::from_text(
            "HyperX QuadCast".to_string(),
            "Electronics".to_string(),
            139.49,
            "HyperX QuadCast\nCondenser microphone for streaming and podcasts",
            24,
        )
    }

    #[test]
    fn test_prompt_rounds_price() {
        let item = sample();
        assert!(item.prompt.ends_with("Price is $139.00"));
        assert!(item.prompt.starts_with(QUESTION));
    }

    #[test]
    fn test_test_prompt_omits_answer() {
        let item = sample();
        let test_prompt = item.test_prompt();
        assert!(test_prompt.ends_with(PRICE_PREFIX));
        assert!(!test_prompt.contains("139.00"));
    }

    #[test]
    fn test_description_strips_header_and_price() {
        let item = sample();
        assert_eq!(
            item.description(),
            "HyperX QuadCast\nCondenser microphone for streaming and podcasts"
        );
    }
}
