//! Linear ensemble over the three base estimators

use std::path::Path;
use std::sync::Arc;

use deal_core::PredictorKind;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{PricingError, Result};
use crate::forest::ForestPricer;
use crate::frontier::FrontierPricer;
use crate::linear::LinearRegression;
use crate::pricer::Pricer;
use crate::specialist::SpecialistPricer;

pub const FEATURE_NAMES: [&str; 5] = ["Specialist", "Frontier", "RandomForest", "Min", "Max"];

/// Ensemble features: the three estimates plus their min and max
pub fn features(specialist: f64, frontier: f64, random_forest: f64) -> [f64; 5] {
    let min = specialist.min(frontier).min(random_forest);
    let max = specialist.max(frontier).max(random_forest);
    [specialist, frontier, random_forest, min, max]
}

/// Fitted ensemble weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleModel {
    regression: LinearRegression,
}

impl EnsembleModel {
    /// Fit on `(specialist, frontier, random_forest)` estimates against true prices
    #[instrument(skip_all, fields(rows = estimates.len()))]
    pub fn fit(estimates: &[[f64; 3]], prices: &[f64]) -> Result<Self> {
        let rows: Vec<Vec<f64>> = estimates
            .iter()
            .map(|[s, f, r]| features(*s, *f, *r).to_vec())
            .collect();
        let regression = LinearRegression::fit(&rows, prices)?;

        for (name, weight) in FEATURE_NAMES.iter().zip(&regression.weights) {
            info!("{}: {:.2}", name, weight);
        }
        info!("Intercept={:.2}", regression.intercept);
        info!("R²={:.3}", regression.r_squared(&rows, prices));

        Ok(Self { regression })
    }

    pub fn from_weights(weights: [f64; 5], intercept: f64) -> Self {
        Self {
            regression: LinearRegression {
                weights: weights.to_vec(),
                intercept,
            },
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.regression.weights
    }

    pub fn intercept(&self) -> f64 {
        self.regression.intercept
    }

    /// Combined estimate, never negative
    pub fn predict(&self, specialist: f64, frontier: f64, random_forest: f64) -> f64 {
        self.regression
            .predict(&features(specialist, frontier, random_forest))
            .max(0.0)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let model: Self = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        if model.regression.weights.len() != FEATURE_NAMES.len() {
            return Err(PricingError::model(format!(
                "Ensemble file has {} weights, expected {}",
                model.regression.weights.len(),
                FEATURE_NAMES.len()
            )));
        }
        Ok(model)
    }
}

/// Every component of one ensemble estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleEstimate {
    pub specialist: f64,
    pub frontier: f64,
    pub random_forest: f64,
    pub min: f64,
    pub max: f64,
    pub ensemble: f64,
}

/// Runs the three base estimators and combines them
pub struct EnsemblePricer {
    specialist: Arc<SpecialistPricer>,
    frontier: Arc<FrontierPricer>,
    forest: Arc<ForestPricer>,
    model: EnsembleModel,
}

impl EnsemblePricer {
    pub fn new(
        specialist: Arc<SpecialistPricer>,
        frontier: Arc<FrontierPricer>,
        forest: Arc<ForestPricer>,
        model: EnsembleModel,
    ) -> Self {
        Self {
            specialist,
            frontier,
            forest,
            model,
        }
    }

    /// One of the base estimators on its own
    pub fn pricer(&self, kind: PredictorKind) -> Pricer {
        match kind {
            PredictorKind::Specialist => Pricer::Specialist(Arc::clone(&self.specialist)),
            PredictorKind::Frontier => Pricer::Frontier(Arc::clone(&self.frontier)),
            PredictorKind::RandomForest => Pricer::RandomForest(Arc::clone(&self.forest)),
        }
    }

    pub fn model(&self) -> &EnsembleModel {
        &self.model
    }

    #[instrument(skip(self, description))]
    pub async fn estimate(&self, description: &str) -> Result<EnsembleEstimate> {
        let (specialist, frontier, random_forest) = tokio::try_join!(
            self.specialist.price(description),
            self.frontier.price(description),
            self.forest.price(description),
        )?;
        let estimate = combine(&self.model, specialist, frontier, random_forest);
        info!(ensemble = estimate.ensemble, "Ensemble estimate");
        Ok(estimate)
    }

    pub async fn price(&self, description: &str) -> Result<f64> {
        Ok(self.estimate(description).await?.ensemble)
    }
}

/// Assemble an estimate from already computed components
pub fn combine(model: &EnsembleModel, specialist: f64, frontier: f64, random_forest: f64) -> EnsembleEstimate {
    let [_, _, _, min, max] = features(specialist, frontier, random_forest);
    EnsembleEstimate {
        specialist,
        frontier,
        random_forest,
        min,
        max,
        ensemble: model.predict(specialist, frontier, random_forest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_bound_every_estimate() {
        for (s, f, r) in [(10.0, 250.0, 99.0), (80.0, 12.5, 300.0), (5.0, 5.0, 5.0)] {
            let x = features(s, f, r);
            for estimate in [s, f, r] {
                assert!(x[3] <= estimate && estimate <= x[4]);
            }
        }
    }

    #[test]
    fn test_fit_on_average_of_estimates() {
        let estimates: Vec<[f64; 3]> = (0..40)
            .map(|i| {
                let truth = 20.0 + i as f64 * 5.0;
                [truth * 0.9, truth * 1.2, truth + ((i % 3) as f64 - 1.0)]
            })
            .collect();
        let prices: Vec<f64> = (0..40).map(|i| 20.0 + i as f64 * 5.0).collect();

        let model = EnsembleModel::fit(&estimates, &prices).unwrap();

        let [s, f, r] = estimates[10];
        assert!((model.predict(s, f, r) - prices[10]).abs() < 2.0);
    }

    #[test]
    fn test_prediction_clamped_at_zero() {
        let model = EnsembleModel::from_weights([1.0, 0.0, 0.0, 0.0, 0.0], -500.0);
        assert_eq!(model.predict(10.0, 10.0, 10.0), 0.0);
    }

    #[test]
    fn test_combine_reports_components() {
        let model = EnsembleModel::from_weights([0.5, 0.5, 0.0, 0.0, 0.0], 1.0);
        let estimate = combine(&model, 100.0, 60.0, 80.0);
        assert_eq!(estimate.min, 60.0);
        assert_eq!(estimate.max, 100.0);
        assert_eq!(estimate.ensemble, 81.0);
    }

    #[test]
    fn test_json_round_trip_validates_width() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ensemble.json");
        let model = EnsembleModel::from_weights([0.1, 0.2, 0.3, 0.4, 0.5], 6.0);
        model.save(&path).unwrap();
        assert_eq!(EnsembleModel::load(&path).unwrap(), model);

        std::fs::write(&path, r#"{"regression": {"weights": [1.0], "intercept": 0.0}}"#).unwrap();
        assert!(EnsembleModel::load(&path).is_err());
    }
}
