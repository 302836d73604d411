//! Opportunities surfaced so far

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use deal_core::{DealError, DealResult, Opportunity, OpportunityRow};
use tracing::{debug, info};

/// Ordered list of opportunities, optionally backed by a JSON file
#[derive(Debug, Default)]
pub struct OpportunityMemory {
    opportunities: Vec<Opportunity>,
    path: Option<PathBuf>,
}

impl OpportunityMemory {
    /// In-memory only
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing file starts an empty memory
    pub fn load(path: impl AsRef<Path>) -> DealResult<Self> {
        let path = path.as_ref().to_path_buf();
        let opportunities = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| DealError::storage(format!("Failed to read {}: {}", path.display(), e)))?;
            serde_json::from_str(&raw)
                .map_err(|e| DealError::parse(format!("Corrupt memory file {}: {}", path.display(), e)))?
        } else {
            Vec::new()
        };

        info!("Loaded {} remembered opportunities", opportunities.len());
        Ok(Self {
            opportunities,
            path: Some(path),
        })
    }

    /// Write to the backing file, if any
    pub fn save(&self) -> DealResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DealError::storage(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&self.opportunities)
            .map_err(|e| DealError::internal(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| DealError::storage(format!("Failed to write {}: {}", path.display(), e)))?;
        debug!("Saved {} opportunities", self.opportunities.len());
        Ok(())
    }

    pub fn push(&mut self, opportunity: Opportunity) {
        self.opportunities.push(opportunity);
    }

    /// Append and persist; on a failed save the memory is left as it was
    pub fn remember(&mut self, opportunity: Opportunity) -> DealResult<()> {
        self.opportunities.push(opportunity);
        if let Err(e) = self.save() {
            self.opportunities.pop();
            return Err(e);
        }
        Ok(())
    }

    /// URLs of every deal already surfaced
    pub fn seen_urls(&self) -> HashSet<String> {
        self.opportunities.iter().map(|o| o.deal.url.clone()).collect()
    }

    pub fn get(&self, index: usize) -> Option<&Opportunity> {
        self.opportunities.get(index)
    }

    pub fn rows(&self) -> Vec<OpportunityRow> {
        self.opportunities.iter().map(Opportunity::row).collect()
    }

    pub fn len(&self) -> usize {
        self.opportunities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deal_core::Deal;

    fn opportunity(url: &str) -> Opportunity {
        Opportunity::new(
            Deal {
                product_description: "Standing desk".to_string(),
                price: 250.0,
                url: url.to_string(),
            },
            400.0,
        )
    }

    #[test]
    fn test_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("memory.json");

        let mut memory = OpportunityMemory::load(&path).unwrap();
        assert!(memory.is_empty());
        memory.push(opportunity("https://deals.test/a"));
        memory.push(opportunity("https://deals.test/b"));
        memory.save().unwrap();

        let reloaded = OpportunityMemory::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.seen_urls().contains("https://deals.test/b"));
        assert_eq!(reloaded.rows()[0].discount, 150.0);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(OpportunityMemory::load(&path), Err(DealError::Parse(_))));
    }

    #[test]
    fn test_failed_save_keeps_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();

        let mut memory = OpportunityMemory::load(blocker.join("memory.json")).unwrap();
        let err = memory.remember(opportunity("https://deals.test/a")).unwrap_err();

        assert!(matches!(err, DealError::Storage(_)));
        assert!(memory.is_empty());
        assert!(memory.seen_urls().is_empty());
    }

    #[test]
    fn test_in_memory_save_is_noop() {
        let mut memory = OpportunityMemory::new();
        memory.push(opportunity("https://deals.test/a"));
        memory.save().unwrap();
        assert!(memory.get(0).is_some());
        assert!(memory.get(1).is_none());
    }
}
