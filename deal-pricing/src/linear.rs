//! Ordinary least squares with an intercept

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PricingError, Result};

/// Keeps the normal equations solvable when features are collinear
const RIDGE: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegression {
    /// Fit by solving the normal equations `(XᵀX) β = Xᵀy`
    pub fn fit(rows: &[Vec<f64>], targets: &[f64]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(PricingError::model("Cannot fit a regression without rows"));
        };
        if rows.len() != targets.len() {
            return Err(PricingError::model(format!(
                "{} rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }

        let width = first.len();
        if let Some(row) = rows.iter().find(|r| r.len() != width) {
            return Err(PricingError::model(format!(
                "Row has {} features, expected {}",
                row.len(),
                width
            )));
        }

        // Column 0 is the intercept
        let size = width + 1;
        let mut gram = Array2::<f64>::zeros((size, size));
        let mut moment = Array1::<f64>::zeros(size);
        let mut augmented = vec![1.0; size];

        for (row, &target) in rows.iter().zip(targets) {
            augmented[1..].copy_from_slice(row);
            for i in 0..size {
                moment[i] += augmented[i] * target;
                for j in 0..size {
                    gram[[i, j]] += augmented[i] * augmented[j];
                }
            }
        }
        for i in 1..size {
            gram[[i, i]] += RIDGE * rows.len() as f64;
        }

        let solution = solve(gram, moment)?;
        Ok(Self {
            intercept: solution[0],
            weights: solution.iter().skip(1).copied().collect(),
        })
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .weights
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }

    /// Coefficient of determination on the given data
    pub fn r_squared(&self, rows: &[Vec<f64>], targets: &[f64]) -> f64 {
        if targets.is_empty() {
            return 0.0;
        }
        let mean = targets.iter().sum::<f64>() / targets.len() as f64;
        let total: f64 = targets.iter().map(|y| (y - mean).powi(2)).sum();
        let residual: f64 = rows
            .iter()
            .zip(targets)
            .map(|(row, y)| (y - self.predict(row)).powi(2))
            .sum();

        if total == 0.0 {
            return if residual == 0.0 { 1.0 } else { 0.0 };
        }
        1.0 - residual / total
    }
}

/// Gaussian elimination with partial pivoting
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    let n = b.len();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&x, &y| a[[x, col]].abs().total_cmp(&a[[y, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() < 1e-12 {
            return Err(PricingError::model("Singular system in least squares fit"));
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }

        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(x)
}
