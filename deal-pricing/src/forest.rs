//! Random forest regression over item embeddings
//!
//! CART trees grown on bootstrap samples, each split choosing among a random
//! subset of features and minimising the squared error of the children.

use std::path::Path;
use std::sync::Arc;

use deal_embedding::TextEncoder;
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{PricingError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    /// Unlimited when `None`
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features considered per split; `None` means sqrt of the feature count
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf { value: f64 },
    Split { feature: usize, threshold: f32, left: usize, right: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, row: ArrayView1<'_, f32>) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f32,
    score: f64,
}

/// Grows one tree with an explicit work stack
struct TreeBuilder<'a> {
    features: ArrayView2<'a, f32>,
    targets: &'a [f64],
    config: &'a ForestConfig,
    mtry: usize,
}

impl TreeBuilder<'_> {
    fn grow(&self, sample: Vec<usize>, rng: &mut StdRng) -> Tree {
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut stack = vec![(0usize, sample, 0usize)];

        while let Some((slot, indices, depth)) = stack.pop() {
            let mean = indices.iter().map(|&i| self.targets[i]).sum::<f64>() / indices.len() as f64;

            let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
            if depth_reached || indices.len() < self.config.min_samples_split.max(2) {
                nodes[slot] = Node::Leaf { value: mean };
                continue;
            }

            let Some(split) = self.best_split(&indices, rng) else {
                nodes[slot] = Node::Leaf { value: mean };
                continue;
            };

            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .into_iter()
                .partition(|&i| self.features[[i, split.feature]] <= split.threshold);

            let left_slot = nodes.len();
            nodes.push(Node::Leaf { value: 0.0 });
            let right_slot = nodes.len();
            nodes.push(Node::Leaf { value: 0.0 });

            nodes[slot] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: left_slot,
                right: right_slot,
            };
            stack.push((right_slot, right, depth + 1));
            stack.push((left_slot, left, depth + 1));
        }

        Tree { nodes }
    }

    fn best_split(&self, indices: &[usize], rng: &mut StdRng) -> Option<BestSplit> {
        let n = indices.len() as f64;
        let total: f64 = indices.iter().map(|&i| self.targets[i]).sum();
        // Maximising sum_l^2/n_l + sum_r^2/n_r minimises the children's SSE
        let parent_score = total * total / n;

        let mut best: Option<BestSplit> = None;
        let candidates = rand::seq::index::sample(rng, self.features.ncols(), self.mtry);

        let mut column: Vec<(f32, f64)> = Vec::with_capacity(indices.len());
        for feature in candidates.iter() {
            column.clear();
            column.extend(indices.iter().map(|&i| (self.features[[i, feature]], self.targets[i])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for split_at in 1..column.len() {
                left_sum += column[split_at - 1].1;
                let (lower, upper) = (column[split_at - 1].0, column[split_at].0);
                if lower == upper {
                    continue;
                }

                let left_n = split_at as f64;
                let right_sum = total - left_sum;
                let score = left_sum * left_sum / left_n + right_sum * right_sum / (n - left_n);

                if score > parent_score + 1e-9 && best.as_ref().is_none_or(|b| score > b.score) {
                    best = Some(BestSplit {
                        feature,
                        threshold: lower + (upper - lower) / 2.0,
                        score,
                    });
                }
            }
        }

        best
    }
}

/// Fitted regression forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    n_features: usize,
    trees: Vec<Tree>,
}

impl RandomForest {
    /// Fit a forest on one row of features per target
    #[instrument(skip(features, targets), fields(rows = features.nrows(), cols = features.ncols()))]
    pub fn fit(features: ArrayView2<'_, f32>, targets: &[f64], config: ForestConfig) -> Result<Self> {
        if features.nrows() == 0 || features.ncols() == 0 {
            return Err(PricingError::model("Cannot fit a forest on an empty matrix"));
        }
        if features.nrows() != targets.len() {
            return Err(PricingError::model(format!(
                "{} feature rows but {} targets",
                features.nrows(),
                targets.len()
            )));
        }
        if config.n_trees == 0 {
            return Err(PricingError::model("n_trees must be positive"));
        }

        let n_features = features.ncols();
        let mtry = config
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().ceil() as usize)
            .clamp(1, n_features);

        let builder = TreeBuilder {
            features: features.view(),
            targets,
            config: &config,
            mtry,
        };

        let rows = features.nrows();
        let mut trees = Vec::with_capacity(config.n_trees);
        for tree_index in 0..config.n_trees {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(tree_index as u64));
            let sample: Vec<usize> = (0..rows).map(|_| rng.random_range(0..rows)).collect();
            let tree = builder.grow(sample, &mut rng);
            debug!(tree = tree_index, nodes = tree.nodes.len(), "Grew tree");
            trees.push(tree);
        }

        info!("Fitted random forest with {} trees", trees.len());
        Ok(Self {
            config,
            n_features,
            trees,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Mean prediction of all trees
    pub fn predict(&self, row: &[f32]) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(PricingError::model(format!(
                "Forest expects {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        let view = ArrayView1::from(row);
        let total: f64 = self.trees.iter().map(|tree| tree.predict(view)).sum();
        Ok(total / self.trees.len() as f64)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        std::fs::write(path, bytes)?;
        info!("Saved random forest to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let (forest, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
        Ok(forest)
    }
}

/// Prices a description by running its embedding through the forest
pub struct ForestPricer {
    forest: Arc<RandomForest>,
    encoder: Arc<dyn TextEncoder>,
}

impl ForestPricer {
    pub fn new(forest: Arc<RandomForest>, encoder: Arc<dyn TextEncoder>) -> Self {
        Self { forest, encoder }
    }

    #[instrument(skip(self, description))]
    pub async fn price(&self, description: &str) -> Result<f64> {
        let vector = self.encoder.encode(description).await?;
        Ok(self.forest.predict(&vector)?.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// y = 100 when x0 > 0.5, else 10; x1 is noise
    fn step_data() -> (Array2<f32>, Vec<f64>) {
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for i in 0..60 {
            let x0 = i as f32 / 60.0;
            let x1 = ((i * 7) % 13) as f32;
            rows.extend([x0, x1]);
            targets.push(if x0 > 0.5 { 100.0 } else { 10.0 });
        }
        (Array2::from_shape_vec((60, 2), rows).unwrap(), targets)
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_trees: 15,
            max_features: Some(2),
            ..ForestConfig::default()
        }
    }

    #[test]
    fn test_learns_step_function() {
        let (x, y) = step_data();
        let forest = RandomForest::fit(x.view(), &y, small_config()).unwrap();

        assert!((forest.predict(&[0.1, 3.0]).unwrap() - 10.0).abs() < 5.0);
        assert!((forest.predict(&[0.9, 3.0]).unwrap() - 100.0).abs() < 5.0);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = step_data();
        let a = RandomForest::fit(x.view(), &y, small_config()).unwrap();
        let b = RandomForest::fit(x.view(), &y, small_config()).unwrap();
        for probe in [[0.2f32, 1.0], [0.51, 9.0], [0.75, 4.0]] {
            assert_eq!(a.predict(&probe).unwrap(), b.predict(&probe).unwrap());
        }
    }

    #[test]
    fn test_depth_limit_gives_stump() {
        let (x, y) = step_data();
        let config = ForestConfig {
            n_trees: 1,
            max_depth: Some(0),
            ..small_config()
        };
        let forest = RandomForest::fit(x.view(), &y, config).unwrap();
        assert_eq!(forest.trees[0].nodes.len(), 1);
    }

    #[test]
    fn test_rejects_bad_input() {
        let (x, y) = step_data();
        assert!(RandomForest::fit(x.view(), &y[..10], small_config()).is_err());

        let forest = RandomForest::fit(x.view(), &y, small_config()).unwrap();
        assert!(matches!(forest.predict(&[1.0]), Err(PricingError::Model(_))));
    }

    #[test]
    fn test_save_and_load() {
        let (x, y) = step_data();
        let forest = RandomForest::fit(x.view(), &y, small_config()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("forest.bin");

        forest.save(&path).unwrap();
        let loaded = RandomForest::load(&path).unwrap();

        assert_eq!(loaded.n_features(), 2);
        assert_eq!(loaded.predict(&[0.8, 2.0]).unwrap(), forest.predict(&[0.8, 2.0]).unwrap());
    }
}
