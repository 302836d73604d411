//! The closed set of base price estimators

use std::sync::Arc;

use deal_core::PredictorKind;

use crate::error::Result;
use crate::forest::ForestPricer;
use crate::frontier::FrontierPricer;
use crate::specialist::SpecialistPricer;

/// A single base estimator
#[derive(Clone)]
pub enum Pricer {
    Specialist(Arc<SpecialistPricer>),
    Frontier(Arc<FrontierPricer>),
    RandomForest(Arc<ForestPricer>),
}

impl Pricer {
    pub fn kind(&self) -> PredictorKind {
        match self {
            Self::Specialist(_) => PredictorKind::Specialist,
            Self::Frontier(_) => PredictorKind::Frontier,
            Self::RandomForest(_) => PredictorKind::RandomForest,
        }
    }

    /// Estimated price of a product description
    pub async fn price(&self, description: &str) -> Result<f64> {
        match self {
            Self::Specialist(pricer) => pricer.price(description).await,
            Self::Frontier(pricer) => pricer.price(description).await,
            Self::RandomForest(pricer) => pricer.price(description).await,
        }
    }
}

impl std::fmt::Debug for Pricer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Pricer").field(&self.kind()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deal_core::SpecialistSettings;

    #[tokio::test]
    async fn test_specialist_variant_dispatches() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_header("content-type", "application/json")
            .with_body(r#"{"price": 19.99}"#)
            .create_async()
            .await;

        let specialist = SpecialistPricer::new(&SpecialistSettings {
            url: server.url(),
            token: None,
        })
        .unwrap();
        let pricer = Pricer::Specialist(Arc::new(specialist));

        assert_eq!(pricer.kind(), PredictorKind::Specialist);
        assert_eq!(pricer.price("USB cable").await.unwrap(), 19.99);
    }
}
