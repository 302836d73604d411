//! Retrieval-augmented frontier estimator
//!
//! Looks up the most similar catalogued items, shows them to a hosted chat
//! model as priced examples and asks it to price the new description.

use std::sync::Arc;
use std::time::Duration;

use deal_core::DealConfig;
use deal_embedding::{QueryMatch, TextEncoder, VectorStore};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::llm::{ChatMessage, ChatModel, CompletionOptions};
use crate::parse::parse_price;
use crate::retry::{with_retry, RetryPolicy};

const SYSTEM_PROMPT: &str = "You estimate prices of items. Reply only with the price, no explanation";
const CONTEXT_HEADER: &str =
    "To provide some context, here are some other items that might be similar to the item you need to estimate.\n\n";
const QUESTION_HEADER: &str = "And now the question for you:\n\n";
const ANSWER_PRIMER: &str = "Price is $";

pub const DEFAULT_TOP_K: usize = 5;

/// Hosted model behind the frontier estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierProvider {
    OpenAi,
    DeepSeek,
}

impl FrontierProvider {
    /// DeepSeek when its key is configured, otherwise OpenAI
    pub fn from_config(config: &DealConfig) -> Self {
        if config.deepseek.is_some() {
            Self::DeepSeek
        } else {
            Self::OpenAi
        }
    }

    /// DeepSeek is rate limited under load and gets a few fixed-backoff retries
    pub fn retry_policy(self) -> RetryPolicy {
        match self {
            Self::OpenAi => RetryPolicy::once(),
            Self::DeepSeek => RetryPolicy::fixed(3, Duration::from_secs(2)),
        }
    }
}

pub struct FrontierPricer {
    chat: Arc<dyn ChatModel>,
    encoder: Arc<dyn TextEncoder>,
    store: Arc<VectorStore>,
    collection: String,
    top_k: usize,
    retry: RetryPolicy,
}

impl FrontierPricer {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        encoder: Arc<dyn TextEncoder>,
        store: Arc<VectorStore>,
        collection: impl Into<String>,
        provider: FrontierProvider,
    ) -> Self {
        Self {
            chat,
            encoder,
            store,
            collection: collection.into(),
            top_k: DEFAULT_TOP_K,
            retry: provider.retry_policy(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Nearest catalogued items to `description`
    pub async fn find_similars(&self, description: &str) -> Result<Vec<QueryMatch>> {
        let vector = self.encoder.encode(description).await?;
        Ok(self.store.query(&self.collection, &vector, self.top_k)?)
    }

    /// Estimate the price of `description`
    #[instrument(skip(self, description), fields(model = self.chat.model()))]
    pub async fn price(&self, description: &str) -> Result<f64> {
        let similars = self.find_similars(description).await?;
        debug!("Retrieved {} similar items", similars.len());

        let messages = messages_for(description, &similars);
        let options = CompletionOptions {
            temperature: Some(0.0),
            seed: Some(42),
            max_tokens: Some(5),
            json: false,
        };

        let reply = with_retry(&self.retry, || self.chat.complete(&messages, &options)).await?;
        let price = parse_price(&reply)?;
        debug!(price, "Frontier estimate");
        Ok(price)
    }
}

/// Context block listing similar items with their prices
pub fn make_context(similars: &[QueryMatch]) -> String {
    let mut message = String::from(CONTEXT_HEADER);
    for similar in similars {
        message.push_str(&format!(
            "Potentially related product:\n{}\nPrice is ${:.2}\n\n",
            similar.document, similar.metadata.price
        ));
    }
    message
}

/// System, user and primed assistant messages for one estimate
pub fn messages_for(description: &str, similars: &[QueryMatch]) -> Vec<ChatMessage> {
    let user_prompt = format!("{}{}{}", make_context(similars), QUESTION_HEADER, description);
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(user_prompt),
        ChatMessage::assistant(ANSWER_PRIMER),
    ]
}
