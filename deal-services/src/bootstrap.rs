//! Wiring components from configuration
//!
//! Binaries build every component once here and share them behind `Arc`.

use std::sync::Arc;

use deal_core::{DealConfig, DealError, DealResult};
use deal_embedding::{EmbeddingClient, TextEncoder, VectorStore};
use deal_pricing::{
    EnsembleModel, EnsemblePricer, ForestPricer, FrontierPricer, FrontierProvider, OpenAiChat,
    RandomForest, SpecialistPricer,
};
use deal_scanner::{DealScanner, DealSelector, RssClient};
use tracing::info;

use crate::deal_service::DealService;
use crate::memory::OpportunityMemory;
use crate::notifier::Notifier;
use crate::planner::Planner;

pub fn encoder(config: &DealConfig) -> Arc<dyn TextEncoder> {
    Arc::new(EmbeddingClient::new(&config.embedding))
}

pub fn open_store(config: &DealConfig) -> DealResult<Arc<VectorStore>> {
    VectorStore::open(&config.store.path)
        .map(Arc::new)
        .map_err(|e| DealError::storage(e.to_string()))
}

pub fn frontier_pricer(
    config: &DealConfig,
    encoder: Arc<dyn TextEncoder>,
    store: Arc<VectorStore>,
) -> FrontierPricer {
    let provider = FrontierProvider::from_config(config);
    info!("Frontier estimator using {:?} ({})", provider, config.frontier_chat().model);
    FrontierPricer::new(
        Arc::new(OpenAiChat::new(config.frontier_chat())),
        encoder,
        store,
        config.store.collection.clone(),
        provider,
    )
    .with_top_k(config.pipeline.retrieval_top_k)
}

pub fn specialist_pricer(config: &DealConfig) -> DealResult<SpecialistPricer> {
    let settings = config
        .specialist
        .as_ref()
        .ok_or_else(|| DealError::config("SPECIALIST_URL is not set"))?;
    SpecialistPricer::new(settings).map_err(|e| DealError::config(e.to_string()))
}

pub fn forest_pricer(config: &DealConfig, encoder: Arc<dyn TextEncoder>) -> DealResult<ForestPricer> {
    let path = &config.pipeline.forest_path;
    let forest = RandomForest::load(path).map_err(|e| {
        DealError::not_found(format!("Random forest {} unavailable: {}", path.display(), e))
    })?;
    Ok(ForestPricer::new(Arc::new(forest), encoder))
}

/// All three estimators plus the fitted ensemble weights
pub fn ensemble_pricer(config: &DealConfig) -> DealResult<EnsemblePricer> {
    let encoder = encoder(config);
    let store = open_store(config)?;

    let path = &config.pipeline.ensemble_path;
    let model = EnsembleModel::load(path).map_err(|e| {
        DealError::not_found(format!("Ensemble weights {} unavailable: {}", path.display(), e))
    })?;

    Ok(EnsemblePricer::new(
        Arc::new(specialist_pricer(config)?),
        Arc::new(frontier_pricer(config, encoder.clone(), store)),
        Arc::new(forest_pricer(config, encoder)?),
        model,
    ))
}

pub fn deal_scanner(config: &DealConfig) -> DealScanner {
    let selector = DealSelector::new(Arc::new(OpenAiChat::new(&config.openai)));
    DealScanner::new(RssClient::new(), selector)
}

/// Deal service with its memory loaded from disk
pub fn deal_service(config: &DealConfig, estimator: Arc<EnsemblePricer>) -> DealResult<DealService> {
    let planner = Planner::new(
        Arc::new(deal_scanner(config)),
        estimator,
        Notifier::from_settings(config.pushover.as_ref()),
        config.pipeline.deal_threshold,
    );
    let memory = OpportunityMemory::load(&config.pipeline.memory_path)?;
    Ok(DealService::new(planner, memory))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(dir: &std::path::Path, extra: &[(&str, &str)]) -> DealConfig {
        let mut map: HashMap<String, String> = HashMap::new();
        map.insert("OPENAI_API_KEY".into(), "sk-test".into());
        map.insert("DATA_DIR".into(), dir.display().to_string());
        map.insert("VECTOR_DB_PATH".into(), dir.join("store.db").display().to_string());
        for (k, v) in extra {
            map.insert(k.to_string(), v.to_string());
        }
        DealConfig::from_source(|key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_ensemble_requires_specialist() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), &[]);
        EnsembleModel::from_weights([0.2; 5], 1.0)
            .save(&config.pipeline.ensemble_path)
            .unwrap();

        assert!(matches!(ensemble_pricer(&config), Err(DealError::Config(_))));
    }

    #[test]
    fn test_ensemble_requires_forest_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), &[("SPECIALIST_URL", "http://localhost:9/price")]);
        EnsembleModel::from_weights([0.2; 5], 1.0)
            .save(&config.pipeline.ensemble_path)
            .unwrap();

        assert!(matches!(ensemble_pricer(&config), Err(DealError::NotFound(_))));
    }
}
