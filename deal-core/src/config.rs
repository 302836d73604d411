//! Runtime configuration
//!
//! Every credential and tunable is read once into [`DealConfig`] and handed to
//! components at construction time. Components never consult the process
//! environment themselves.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DealError, DealResult};

/// OpenAI-compatible chat endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    pub api_key: String,
    /// Base URL of the API (e.g. https://api.openai.com/v1)
    pub api_base: String,
    pub model: String,
}

/// Embedding endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    /// Expected vector dimension
    pub dimension: usize,
}

/// Hosted fine-tuned specialist model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistSettings {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Pushover notification credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushoverSettings {
    pub token: String,
    pub user: String,
}

/// Vector store location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    pub path: PathBuf,
    pub collection: String,
}

/// Pipeline tunables and artifact paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Directory holding item batches
    pub data_dir: PathBuf,
    /// Opportunity memory file
    pub memory_path: PathBuf,
    /// Fitted random forest
    pub forest_path: PathBuf,
    /// Fitted ensemble weights
    pub ensemble_path: PathBuf,
    /// Minimum discount (in dollars) that triggers a notification
    pub deal_threshold: f64,
    /// Similar items retrieved for the frontier prompt
    pub retrieval_top_k: usize,
    /// Seconds between automatic scans (0 disables the timer)
    pub scan_interval_secs: u64,
    pub server_port: u16,
}

/// Complete configuration of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealConfig {
    pub openai: ChatSettings,
    /// DeepSeek replaces OpenAI for the frontier estimator when configured
    pub deepseek: Option<ChatSettings>,
    pub embedding: EmbeddingSettings,
    pub specialist: Option<SpecialistSettings>,
    pub pushover: Option<PushoverSettings>,
    pub store: StoreSettings,
    pub pipeline: PipelineSettings,
}

impl DealConfig {
    /// Load configuration from environment variables
    ///
    /// Expects `OPENAI_API_KEY`; everything else has a default or is optional.
    pub fn from_env() -> DealResult<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source
    pub fn from_source<F>(lookup: F) -> DealResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let openai_key = get("OPENAI_API_KEY")
            .ok_or_else(|| DealError::config("OPENAI_API_KEY is not set"))?;

        let openai = ChatSettings {
            api_key: openai_key.clone(),
            api_base: or("OPENAI_API_BASE", "https://api.openai.com/v1"),
            model: or("OPENAI_CHAT_MODEL", "gpt-4o-mini"),
        };

        let deepseek = get("DEEPSEEK_API_KEY").map(|api_key| ChatSettings {
            api_key,
            api_base: or("DEEPSEEK_API_BASE", "https://api.deepseek.com"),
            model: or("DEEPSEEK_MODEL", "deepseek-chat"),
        });

        let embedding = EmbeddingSettings {
            api_key: get("EMBEDDING_API_KEY").unwrap_or(openai_key),
            api_base: or("EMBEDDING_API_BASE", "https://api.openai.com/v1"),
            model: or("EMBEDDING_MODEL", "text-embedding-3-small"),
            dimension: parse_or(get("EMBEDDING_DIMENSION"), "EMBEDDING_DIMENSION", 1536)?,
        };

        let specialist = get("SPECIALIST_URL").map(|url| SpecialistSettings {
            url,
            token: get("SPECIALIST_TOKEN"),
        });

        let pushover = match (get("PUSHOVER_TOKEN"), get("PUSHOVER_USER")) {
            (Some(token), Some(user)) => Some(PushoverSettings { token, user }),
            _ => None,
        };

        let store = StoreSettings {
            path: PathBuf::from(or("VECTOR_DB_PATH", "data/products_vectorstore.db")),
            collection: or("VECTOR_COLLECTION", "products"),
        };

        let data_dir = PathBuf::from(or("DATA_DIR", "data"));
        let pipeline = PipelineSettings {
            memory_path: get("MEMORY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("memory.json")),
            forest_path: get("FOREST_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("random_forest.bin")),
            ensemble_path: get("ENSEMBLE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("ensemble.json")),
            data_dir,
            deal_threshold: parse_or(get("DEAL_THRESHOLD"), "DEAL_THRESHOLD", 50.0)?,
            retrieval_top_k: parse_or(get("RETRIEVAL_TOP_K"), "RETRIEVAL_TOP_K", 5)?,
            scan_interval_secs: parse_or(get("SCAN_INTERVAL_SECS"), "SCAN_INTERVAL_SECS", 0)?,
            server_port: parse_or(get("SERVER_PORT"), "SERVER_PORT", 7860)?,
        };

        Ok(Self {
            openai,
            deepseek,
            embedding,
            specialist,
            pushover,
            store,
            pipeline,
        })
    }

    /// Chat settings used by the frontier estimator
    pub fn frontier_chat(&self) -> &ChatSettings {
        self.deepseek.as_ref().unwrap_or(&self.openai)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> DealResult<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| DealError::config(format!("Invalid value for {}: {}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> DealResult<DealConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DealConfig::from_source(|key| map.get(key).cloned())
    }

    #[test]
    fn test_requires_openai_key() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, DealError::Config(_)));
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.embedding.api_key, "sk-test");
        assert_eq!(config.pipeline.deal_threshold, 50.0);
        assert_eq!(config.pipeline.retrieval_top_k, 5);
        assert_eq!(config.pipeline.memory_path, PathBuf::from("data/memory.json"));
        assert!(config.deepseek.is_none());
        assert!(config.pushover.is_none());
        assert_eq!(config.frontier_chat().model, "gpt-4o-mini");
    }

    #[test]
    fn test_deepseek_takes_over_frontier() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("DEEPSEEK_API_KEY", "ds-test"),
        ])
        .unwrap();
        assert_eq!(config.frontier_chat().model, "deepseek-chat");
        assert_eq!(config.frontier_chat().api_base, "https://api.deepseek.com");
    }

    #[test]
    fn test_pushover_needs_both_values() {
        let config = config_from(&[("OPENAI_API_KEY", "k"), ("PUSHOVER_TOKEN", "t")]).unwrap();
        assert!(config.pushover.is_none());
    }

    #[test]
    fn test_invalid_number() {
        let err = config_from(&[("OPENAI_API_KEY", "k"), ("DEAL_THRESHOLD", "lots")]).unwrap_err();
        assert!(err.to_string().contains("DEAL_THRESHOLD"));
    }
}
