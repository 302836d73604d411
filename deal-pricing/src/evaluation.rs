//! Scoring an estimator against held-out items

use std::fmt;
use std::future::Future;

use deal_core::Item;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

pub const DEFAULT_SIZE: usize = 250;

/// Accuracy band of a single guess
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Good,
    Fair,
    Poor,
}

impl Band {
    /// Within $40 or 20% is good, within $80 or 40% is fair
    pub fn classify(error: f64, truth: f64) -> Self {
        if error < 40.0 || error / truth < 0.2 {
            Band::Good
        } else if error < 80.0 || error / truth < 0.4 {
            Band::Fair
        } else {
            Band::Poor
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Band::Good => "good",
            Band::Fair => "fair",
            Band::Poor => "poor",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scored {
    pub title: String,
    pub truth: f64,
    pub guess: f64,
    pub error: f64,
    pub squared_log_error: f64,
    pub band: Band,
}

impl Scored {
    pub fn new(title: &str, truth: f64, guess: f64) -> Self {
        let error = (guess - truth).abs();
        let log_error = (truth + 1.0).ln() - (guess.max(0.0) + 1.0).ln();
        Self {
            title: title.to_string(),
            truth,
            guess,
            error,
            squared_log_error: log_error * log_error,
            band: Band::classify(error, truth),
        }
    }
}

/// Aggregate metrics over an evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub name: String,
    pub results: Vec<Scored>,
    /// Items whose estimate failed; they are not scored
    pub failures: usize,
}

impl EvaluationReport {
    pub fn mean_error(&self) -> f64 {
        mean(self.results.iter().map(|r| r.error))
    }

    pub fn rmsle(&self) -> f64 {
        mean(self.results.iter().map(|r| r.squared_log_error)).sqrt()
    }

    /// Percentage of scored guesses in the good band
    pub fn hit_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        let hits = self.results.iter().filter(|r| r.band == Band::Good).count();
        hits as f64 / self.results.len() as f64 * 100.0
    }

    pub fn count(&self, band: Band) -> usize {
        self.results.iter().filter(|r| r.band == band).count()
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Error=${:.2} RMSLE={:.2} Hits={:.1}% ({} scored, {} failed)",
            self.name,
            self.mean_error(),
            self.rmsle(),
            self.hit_rate(),
            self.results.len(),
            self.failures
        )
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Run `predictor` over the first `size` items, one at a time
///
/// The predictor receives each item's description. Failed estimates are
/// logged and counted rather than scored as zero.
pub async fn evaluate<F, Fut>(name: &str, items: &[Item], size: usize, predictor: F) -> EvaluationReport
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<f64>>,
{
    let mut results = Vec::new();
    let mut failures = 0;

    for (i, item) in items.iter().take(size).enumerate() {
        match predictor(item.description()).await {
            Ok(guess) => {
                let scored = Scored::new(&item.title, item.price, guess);
                info!(
                    "{}: Guess: ${:.2} Truth: ${:.2} Error: ${:.2} SLE: {:.2} Item: {} [{}]",
                    i + 1,
                    scored.guess,
                    scored.truth,
                    scored.error,
                    scored.squared_log_error,
                    truncate_title(&item.title),
                    scored.band
                );
                results.push(scored);
            }
            Err(e) => {
                warn!("{}: estimate failed for {}: {}", i + 1, truncate_title(&item.title), e);
                failures += 1;
            }
        }
    }

    let report = EvaluationReport {
        name: name.to_string(),
        results,
        failures,
    };
    info!("{}", report);
    report
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() <= 40 {
        title.to_string()
    } else {
        format!("{}...", title.chars().take(40).collect::<String>())
    }
}
