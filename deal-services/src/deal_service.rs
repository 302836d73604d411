//! Deal Service
//!
//! Owns the planner and the opportunity memory. Scan cycles are serialized,
//! so the periodic timer and a manual trigger never overlap.

use std::sync::Arc;
use std::time::Duration;

use deal_core::{DealError, DealResult, Opportunity, OpportunityRow};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::memory::OpportunityMemory;
use crate::planner::Planner;

pub struct DealService {
    planner: Planner,
    memory: RwLock<OpportunityMemory>,
    cycle: Mutex<()>,
}

impl DealService {
    pub fn new(planner: Planner, memory: OpportunityMemory) -> Self {
        Self {
            planner,
            memory: RwLock::new(memory),
            cycle: Mutex::new(()),
        }
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    /// Run one scan cycle and remember any opportunity it surfaces
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> DealResult<Option<Opportunity>> {
        let _cycle = self.cycle.lock().await;

        let found = {
            let memory = self.memory.read().await;
            self.planner.plan(&memory).await?
        };

        if let Some(opportunity) = &found {
            let mut memory = self.memory.write().await;
            memory.remember(opportunity.clone())?;
            info!(total = memory.len(), "Remembered new opportunity");
        }

        Ok(found)
    }

    /// Opportunity table, oldest first
    pub async fn table(&self) -> Vec<OpportunityRow> {
        self.memory.read().await.rows()
    }

    /// Re-send the alert for the opportunity at `index`
    pub async fn notify_row(&self, index: usize) -> DealResult<Opportunity> {
        let opportunity = self
            .memory
            .read()
            .await
            .get(index)
            .cloned()
            .ok_or_else(|| DealError::not_found(format!("No opportunity at row {}", index)))?;

        self.planner.notifier().alert(&opportunity).await;
        Ok(opportunity)
    }

    /// Run cycles every `interval` in the background
    ///
    /// A failed cycle is logged; the timer keeps running.
    pub fn spawn_timer(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        info!("Scanning for deals every {:?}", interval);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_cycle().await {
                    error!("Scan cycle failed: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::Notifier;
    use crate::planner::tests::{deal, estimator, FixedSource};

    fn service(memory: OpportunityMemory) -> (Arc<FixedSource>, DealService) {
        let source = Arc::new(FixedSource::new(vec![deal("grill", 150.0), deal("fan", 20.0)]));
        let planner = Planner::new(
            source.clone(),
            estimator(&[("grill", 300.0), ("fan", 40.0)]),
            Notifier::Log,
            50.0,
        );
        (source, DealService::new(planner, memory))
    }

    #[tokio::test]
    async fn test_cycle_remembers_and_skips_seen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        let (_, service) = service(OpportunityMemory::load(&path).unwrap());

        let first = service.run_cycle().await.unwrap().unwrap();
        assert_eq!(first.deal.product_description, "grill");

        // grill is now seen; fan alone is below the threshold
        assert!(service.run_cycle().await.unwrap().is_none());

        let rows = service.table().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].discount, 150.0);
        assert_eq!(OpportunityMemory::load(&path).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_leaves_table_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();
        let (_, service) = service(OpportunityMemory::load(blocker.join("memory.json")).unwrap());

        let err = service.run_cycle().await.unwrap_err();

        assert!(matches!(err, DealError::Storage(_)));
        assert!(service.table().await.is_empty());
    }

    #[tokio::test]
    async fn test_notify_row() {
        let (_, service) = service(OpportunityMemory::new());
        service.run_cycle().await.unwrap();

        assert_eq!(service.notify_row(0).await.unwrap().deal.price, 150.0);
        assert!(matches!(service.notify_row(3).await, Err(DealError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_runs_cycles() {
        let (source, service) = service(OpportunityMemory::new());
        let service = Arc::new(service);

        let handle = Arc::clone(&service).spawn_timer(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(150)).await;
        handle.abort();

        assert_eq!(source.seen_calls.lock().unwrap().len(), 3);
        assert_eq!(service.table().await.len(), 1);
    }
}
