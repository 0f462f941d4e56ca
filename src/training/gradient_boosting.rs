//! Gradient boosted trees for the cancellation label
//!
//! Each round fits a shallow regression tree to the log-loss residuals
//! `y - p` and adds its shrunken output to the running log-odds.

use ndarray::{Array1, Array2, Axis};
use rand::seq::index;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTree;
use crate::error::{PipelineError, Result};

/// Boosting hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingConfig {
    /// Boosting rounds
    pub n_estimators: usize,
    /// Shrinkage applied to every tree
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn without replacement per round; 1.0 uses all
    pub subsample: f64,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
        }
    }
}

fn logistic(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Binary gradient boosting classifier; `seed` drives row subsampling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    seed: u64,
    /// Log-odds of the training cancellation rate
    base_score: f64,
    trees: Vec<DecisionTree>,
    importances: Option<Array1<f64>>,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            base_score: 0.0,
            trees: Vec::new(),
            importances: None,
        }
    }

    /// Fit on labels in {0, 1}
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let (n_rows, n_features) = x.dim();
        if n_rows != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} labels", n_rows),
                actual: format!("{} labels", y.len()),
            });
        }
        if n_rows == 0 {
            return Err(PipelineError::TrainingError(
                "Cannot boost on zero rows".to_string(),
            ));
        }

        let rate = y.mean().unwrap_or(0.5).clamp(1e-6, 1.0 - 1e-6);
        self.base_score = (rate / (1.0 - rate)).ln();
        self.trees.clear();

        let mut scores = Array1::from_elem(n_rows, self.base_score);
        let mut importances = Array1::<f64>::zeros(n_features);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let n_sampled = ((n_rows as f64 * self.config.subsample).ceil() as usize).clamp(1, n_rows);

        for _ in 0..self.config.n_estimators {
            let residuals = y - &scores.mapv(logistic);

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(Some(self.config.max_depth))
                .with_min_samples_leaf(self.config.min_samples_leaf);

            if n_sampled < n_rows {
                let mut rows = index::sample(&mut rng, n_rows, n_sampled).into_vec();
                rows.sort_unstable();
                tree.fit(&x.select(Axis(0), &rows), &residuals.select(Axis(0), &rows))?;
            } else {
                tree.fit(x, &residuals)?;
            }

            scores.scaled_add(self.config.learning_rate, &tree.predict(x)?);
            if let Some(imp) = tree.feature_importances() {
                importances += imp;
            }
            self.trees.push(tree);
        }

        let total = importances.sum();
        if total > 0.0 {
            importances /= total;
        }
        self.importances = Some(importances);
        Ok(self)
    }

    /// Summed log-odds before the logistic link
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }
        let mut scores = Array1::from_elem(x.nrows(), self.base_score);
        for tree in &self.trees {
            scores.scaled_add(self.config.learning_rate, &tree.predict(x)?);
        }
        Ok(scores)
    }

    /// Probability of label 1
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(logistic))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .decision_function(x)?
            .mapv(|s| if s > 0.0 { 1.0 } else { 0.0 }))
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.importances.as_ref()
    }
}
