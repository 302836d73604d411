//! Raw product records and the item normalizer

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use deal_core::Item;

use crate::error::Result;
use crate::tokenizer::Tokenizer;

/// Boilerplate fragments removed from the details blob
const DETAIL_REMOVALS: [&str; 13] = [
    "\"Batteries Included?\": \"No\"",
    "\"Batteries Included?\": \"Yes\"",
    "\"Batteries Required?\": \"No\"",
    "\"Batteries Required?\": \"Yes\"",
    "By Manufacturer",
    "Item",
    "Date First",
    "Package",
    ":",
    "Number of",
    "Best Sellers",
    "Number",
    "Product ",
];

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[:\[\]"{}【】\s]+"#).expect("valid separator pattern"));

/// A product record as found in the raw JSONL dumps
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    /// Either a JSON object or a JSON-encoded string
    #[serde(default)]
    pub details: Value,
    /// String, number or null
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub main_category: Option<String>,
}

/// Budgets and bounds applied during normalization
#[derive(Debug, Clone)]
pub struct ItemConfig {
    /// Items with this many tokens or fewer are dropped
    pub min_tokens: usize,
    /// Text is truncated to this many tokens
    pub max_tokens: usize,
    /// Content must be longer than this many characters
    pub min_chars: usize,
    /// Content is cut at this many characters before tokenizing
    pub ceiling_chars: usize,
    pub min_price: f64,
    pub max_price: f64,
}

impl Default for ItemConfig {
    fn default() -> Self {
        let max_tokens = 160;
        Self {
            min_tokens: 150,
            max_tokens,
            min_chars: 300,
            ceiling_chars: max_tokens * 7,
            min_price: 1.0,
            max_price: 999.0,
        }
    }
}

/// Turns raw records into curated items
#[derive(Debug)]
pub struct ItemNormalizer {
    tokenizer: Tokenizer,
    config: ItemConfig,
}

impl ItemNormalizer {
    pub fn new(tokenizer: Tokenizer, config: ItemConfig) -> Self {
        Self { tokenizer, config }
    }

    pub fn config(&self) -> &ItemConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Normalize a raw record
    ///
    /// Returns `Ok(None)` for records that fail a data-quality check
    /// (price missing or out of range, too little text). Only tokenizer
    /// failures are reported as errors.
    pub fn normalize(&self, raw: &RawProduct, category: &str) -> Result<Option<Item>> {
        let Some(price) = parse_price(&raw.price) else {
            trace!("Dropping '{}': no usable price", raw.title);
            return Ok(None);
        };
        if price < self.config.min_price || price > self.config.max_price {
            trace!("Dropping '{}': price {} out of range", raw.title, price);
            return Ok(None);
        }

        let contents = self.contents(raw);
        if contents.chars().count() <= self.config.min_chars {
            return Ok(None);
        }
        let contents: String = contents.chars().take(self.config.ceiling_chars).collect();

        let text = format!("{}\n{}", scrub(&raw.title), scrub(&contents));
        if self.tokenizer.count(&text)? <= self.config.min_tokens {
            return Ok(None);
        }
        let (text, _) = self.tokenizer.truncate(&text, self.config.max_tokens)?;

        let prompt = deal_core::item::make_prompt(&text, price);
        let token_count = self.tokenizer.count(&prompt)?;
        let category = raw
            .main_category
            .as_deref()
            .filter(|_| category.is_empty())
            .unwrap_or(category)
            .to_string();

        Ok(Some(Item::from_text(
            raw.title.clone(),
            category,
            price,
            &text,
            token_count,
        )))
    }

    /// Description, features and scrubbed details, one block per line
    fn contents(&self, raw: &RawProduct) -> String {
        let mut contents = raw.description.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        let features = raw.features.join("\n");
        if !features.is_empty() {
            contents.push_str(&features);
            contents.push('\n');
        }
        let details = render_details(&raw.details);
        if !details.is_empty() {
            contents.push_str(&scrub_details(&details));
            contents.push('\n');
        }
        contents
    }
}

/// Parse a price field: strings may carry `$` and `,`
pub fn parse_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.replace(['$', ','], "").trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (price.is_finite() && price > 0.0).then_some(price)
}

/// Render details the way the dumps encode them: `{"Key": "Value", ...}`
fn render_details(details: &Value) -> String {
    match details {
        Value::String(s) => s.clone(),
        Value::Object(map) if !map.is_empty() => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", Value::String(k.clone()), v))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        _ => String::new(),
    }
}

fn scrub_details(details: &str) -> String {
    DETAIL_REMOVALS
        .iter()
        .fold(details.to_string(), |acc, removal| acc.replace(removal, ""))
}

/// Collapse punctuation and whitespace, then drop long tokens containing
/// digits (part numbers add noise without telling anything about price)
fn scrub(text: &str) -> String {
    let collapsed = SEPARATORS.replace_all(text, " ");
    let collapsed = collapsed
        .trim()
        .replace(" ,", ",")
        .replace(",,,", ",")
        .replace(",,", ",");
    collapsed
        .split(' ')
        .filter(|word| word.chars().count() < 7 || !word.chars().any(|c| c.is_ascii_digit()))
        .collect::<Vec<_>>()
        .join(" ")
}
