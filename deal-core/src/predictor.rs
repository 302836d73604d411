//! Predictor kinds that contribute to the ensemble

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of base price predictors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorKind {
    /// Remotely hosted fine-tuned model
    Specialist,
    /// Retrieval-augmented frontier LLM
    Frontier,
    /// Random forest over item embeddings
    RandomForest,
}

impl PredictorKind {
    pub const ALL: [PredictorKind; 3] = [
        PredictorKind::Specialist,
        PredictorKind::Frontier,
        PredictorKind::RandomForest,
    ];

    /// Column name used in ensemble features and reports
    pub fn display_name(&self) -> &'static str {
        match self {
            PredictorKind::Specialist => "Specialist",
            PredictorKind::Frontier => "Frontier",
            PredictorKind::RandomForest => "RandomForest",
        }
    }
}

impl fmt::Display for PredictorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for PredictorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "specialist" | "s" => Ok(PredictorKind::Specialist),
            "frontier" | "rag" | "f" => Ok(PredictorKind::Frontier),
            "random_forest" | "randomforest" | "forest" | "rf" => Ok(PredictorKind::RandomForest),
            _ => Err(format!("Unknown predictor: {}", s)),
        }
    }
}
