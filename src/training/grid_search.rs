//! Exhaustive random forest search under stratified cross-validation

use super::config::{RandomForestGrid, RandomForestParams};
use super::cross_validation::{CVResults, StratifiedKFold};
use super::random_forest::RandomForest;
use crate::error::{PipelineError, Result};
use crate::evaluation::metrics::f1_score;
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Cross-validated score of one grid candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: RandomForestParams,
    pub cv: CVResults,
}

/// Outcome of a grid search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchResult {
    /// Highest mean F1, first in grid order on ties
    pub best_params: RandomForestParams,
    pub best_score: f64,
    /// Every candidate in grid order
    pub candidates: Vec<CandidateScore>,
}

/// Grid search over random forest hyperparameters, scored by mean F1
#[derive(Debug, Clone)]
pub struct GridSearch {
    grid: RandomForestGrid,
    cv: StratifiedKFold,
    random_state: u64,
}

impl GridSearch {
    pub fn new(grid: RandomForestGrid, n_splits: usize, random_state: u64) -> Self {
        Self {
            grid,
            cv: StratifiedKFold::new(n_splits),
            random_state,
        }
    }

    /// Score every candidate; candidates run in parallel and are collected in grid order
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<GridSearchResult> {
        let candidates = self.grid.candidates();
        if candidates.is_empty() {
            return Err(PipelineError::TrainingError(
                "Random forest grid is empty".to_string(),
            ));
        }

        let folds = self.cv.split(y)?;
        info!(
            candidates = candidates.len(),
            folds = folds.len(),
            "Starting random forest grid search"
        );

        let scored: Vec<CandidateScore> = candidates
            .par_iter()
            .map(|params| {
                let scores = folds
                    .iter()
                    .map(|fold| {
                        let x_train = x.select(Axis(0), &fold.train_indices);
                        let y_train = y.select(Axis(0), &fold.train_indices);
                        let x_val = x.select(Axis(0), &fold.test_indices);
                        let y_val = y.select(Axis(0), &fold.test_indices);

                        let mut forest = RandomForest::new(*params, self.random_state);
                        forest.fit(&x_train, &y_train)?;
                        Ok(f1_score(&y_val, &forest.predict(&x_val)?))
                    })
                    .collect::<Result<Vec<f64>>>()?;

                let cv = CVResults::from_scores(scores);
                debug!(?params, mean_f1 = cv.mean_score, "Scored candidate");
                Ok(CandidateScore { params: *params, cv })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut best = &scored[0];
        for candidate in &scored[1..] {
            if candidate.cv.mean_score > best.cv.mean_score {
                best = candidate;
            }
        }

        info!(
            params = ?best.params,
            mean_f1 = best.cv.mean_score,
            "Grid search selected best parameters"
        );

        Ok(GridSearchResult {
            best_params: best.params,
            best_score: best.cv.mean_score,
            candidates: scored,
        })
    }
}
