//! Training configuration

use super::gradient_boosting::GradientBoostingConfig;
use serde::{Deserialize, Serialize};

/// Hyperparameters of one random forest candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomForestParams {
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth, `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

/// Search space for the random forest grid search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
}

impl Default for RandomForestGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![50, 100],
            max_depth: vec![Some(10), Some(20), None],
            min_samples_split: vec![2, 5],
        }
    }
}

impl RandomForestGrid {
    /// All combinations in grid order: `max_depth` varies slowest,
    /// then `min_samples_split`, then `n_estimators`.
    pub fn candidates(&self) -> Vec<RandomForestParams> {
        let mut out = Vec::with_capacity(
            self.max_depth.len() * self.min_samples_split.len() * self.n_estimators.len(),
        );
        for &max_depth in &self.max_depth {
            for &min_samples_split in &self.min_samples_split {
                for &n_estimators in &self.n_estimators {
                    out.push(RandomForestParams {
                        n_estimators,
                        max_depth,
                        min_samples_split,
                    });
                }
            }
        }
        out
    }
}

/// Configuration for model training
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Seed shared by the split, SMOTE and every model
    pub random_state: u64,

    /// Fraction of rows held out for evaluation
    pub test_size: f64,

    /// Number of stratified folds in the grid search
    pub cv_folds: usize,

    /// Neighbours used by SMOTE
    pub smote_k_neighbors: usize,

    /// Logistic regression iteration cap
    pub logistic_max_iter: usize,

    /// Logistic regression L2 strength
    pub logistic_alpha: f64,

    /// Baseline random forest
    pub random_forest: RandomForestParams,

    /// Boosted-tree ensemble
    pub gradient_boosting: GradientBoostingConfig,

    /// Grid searched for the tuned random forest
    pub grid: RandomForestGrid,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            random_state: 42,
            test_size: 0.2,
            cv_folds: 3,
            smote_k_neighbors: 5,
            logistic_max_iter: 1000,
            logistic_alpha: 0.01,
            random_forest: RandomForestParams::default(),
            gradient_boosting: GradientBoostingConfig::default(),
            grid: RandomForestGrid::default(),
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set the held-out fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Builder method to set the number of CV folds
    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// Builder method to replace the grid
    pub fn with_grid(mut self, grid: RandomForestGrid) -> Self {
        self.grid = grid;
        self
    }
}
