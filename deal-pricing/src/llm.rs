//! Chat completion seam
//!
//! Estimators and the deal selector talk to language models through
//! [`ChatModel`], so tests can substitute a scripted model.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use deal_core::ChatSettings;
use tracing::{debug, instrument};

use crate::error::{PricingError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    /// Prefilled start of the model's answer
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling options for a single completion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub seed: Option<i64>,
    pub max_tokens: Option<u32>,
    /// Ask the provider for a JSON object reply
    pub json: bool,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Return the text of the first choice
    async fn complete(&self, messages: &[ChatMessage], options: &CompletionOptions) -> Result<String>;

    fn model(&self) -> &str;
}

/// Chat client for OpenAI and OpenAI-compatible providers (DeepSeek)
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChat {
    pub fn new(settings: &ChatSettings) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(settings.api_key.clone())
            .with_api_base(settings.api_base.clone());

        Self {
            client: Client::with_config(config),
            model: settings.model.clone(),
        }
    }
}

fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let built = match message.role {
        ChatRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.as_str())
            .build()
            .map(Into::into),
        ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.as_str())
            .build()
            .map(Into::into),
        ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(message.content.as_str())
            .build()
            .map(Into::into),
    };
    built.map_err(|e| PricingError::model(e.to_string()))
}

#[async_trait]
impl ChatModel for OpenAiChat {
    #[instrument(skip(self, messages, options), fields(model = %self.model))]
    async fn complete(&self, messages: &[ChatMessage], options: &CompletionOptions) -> Result<String> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages);
        if let Some(temperature) = options.temperature {
            args.temperature(temperature);
        }
        if let Some(seed) = options.seed {
            args.seed(seed);
        }
        if let Some(max_tokens) = options.max_tokens {
            #[allow(deprecated)]
            args.max_tokens(max_tokens);
        }
        if options.json {
            args.response_format(ResponseFormat::JsonObject);
        }
        let request = args.build().map_err(|e| PricingError::model(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PricingError::api(format!("Chat API error: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| PricingError::api("No response from chat model"))?;

        debug!(reply = %content, "Chat completion received");
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Extract a JSON object from a model reply, tolerating markdown fences
pub fn extract_json(content: &str) -> Option<&str> {
    // Try to find JSON in code blocks first
    if let Some(start) = content.find("```json") {
        let start = start + 7;
        if let Some(end) = content[start..].find("```") {
            return Some(content[start..start + end].trim());
        }
    }

    // Try to find raw JSON
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end >= start).then(|| &content[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_fence() {
        let reply = "Here you go:\n```json\n{\"deals\": []}\n```\nThanks";
        assert_eq!(extract_json(reply), Some("{\"deals\": []}"));
    }

    #[test]
    fn test_extract_json_raw() {
        assert_eq!(extract_json("noise {\"a\": 1} tail"), Some("{\"a\": 1}"));
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(ChatMessage::assistant("Price is $").role, ChatRole::Assistant);
        assert_eq!(ChatMessage::system("x").content, "x");
    }

    #[tokio::test]
    #[ignore = "requires OPENAI_API_KEY"]
    async fn test_openai_chat_live() {
        let settings = ChatSettings {
            api_key: std::env::var("OPENAI_API_KEY").unwrap(),
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
        };
        let chat = OpenAiChat::new(&settings);
        let reply = chat
            .complete(&[ChatMessage::user("Reply with the number 7 only")], &CompletionOptions::default())
            .await
            .unwrap();
        assert!(reply.contains('7'));
    }
}
