//! Training engine implementation

use super::config::TrainingConfig;
use super::cross_validation::{stratified_train_test_split, SplitIndices};
use super::gradient_boosting::GradientBoostingClassifier;
use super::grid_search::{GridSearch, GridSearchResult};
use super::linear_models::LogisticRegression;
use super::random_forest::RandomForest;
use super::models::{
    NamedModel, TrainedModel, GRADIENT_BOOSTING, LOGISTIC_REGRESSION, RANDOM_FOREST,
    RANDOM_FOREST_TUNED,
};
use crate::error::{PipelineError, Result};
use crate::synthetic::{class_counts, Sampler, SMOTE};
use crate::utils::frame::{columns_to_array2, dense_numeric_values, has_column};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use std::time::Instant;
use tracing::{info, info_span, Span};

/// Everything the evaluator needs from a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Fitted models in training order
    pub models: Vec<NamedModel>,
    /// Held-out features, never resampled
    pub x_test: Array2<f64>,
    /// Held-out labels
    pub y_test: Array1<f64>,
    pub split: SplitIndices,
    pub grid_search: GridSearchResult,
    /// Training rows after SMOTE
    pub n_resampled: usize,
}

/// Splits the encoded table, rebalances the training part and fits
/// every model variant.
pub struct Trainer {
    config: TrainingConfig,
    span: Span,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(TrainingConfig::default())
    }
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            span: info_span!("trainer"),
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train all models on an encoded table.
    ///
    /// `feature_columns` fixes the column order of the feature matrix; the
    /// target must be present and numeric.
    pub fn train(
        &self,
        df: &DataFrame,
        feature_columns: &[String],
        target_column: &str,
    ) -> Result<TrainingOutcome> {
        let _enter = self.span.enter();
        let start = Instant::now();

        if !has_column(df, target_column) {
            return Err(PipelineError::MissingColumn(target_column.to_string()));
        }
        let x = columns_to_array2(df, feature_columns)?;
        let y = Array1::from_vec(dense_numeric_values(df, target_column)?);
        if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
            return Err(PipelineError::ValidationError(format!(
                "Target '{}' must hold only 0 and 1, found {}",
                target_column, bad
            )));
        }

        let split = stratified_train_test_split(&y, self.config.test_size, self.config.random_state)?;
        let x_train = x.select(Axis(0), &split.train);
        let y_train = y.select(Axis(0), &split.train);
        let x_test = x.select(Axis(0), &split.test);
        let y_test = y.select(Axis(0), &split.test);
        info!(
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            "Stratified split complete"
        );

        // resample the training partition only
        let resampled = SMOTE::new()
            .with_k_neighbors(self.config.smote_k_neighbors)
            .with_seed(self.config.random_state)
            .fit_resample(&x_train, &y_train)?;
        info!(
            before = ?class_counts(&y_train),
            after = ?class_counts(&resampled.y),
            "Applied SMOTE to training data"
        );
        let (x_fit, y_fit) = (&resampled.x, &resampled.y);

        let mut models = Vec::with_capacity(4);

        info!("Training {}", LOGISTIC_REGRESSION);
        let mut logistic = LogisticRegression::new()
            .with_max_iter(self.config.logistic_max_iter)
            .with_alpha(self.config.logistic_alpha);
        logistic.fit(x_fit, y_fit)?;
        models.push(NamedModel::new(
            LOGISTIC_REGRESSION,
            TrainedModel::LogisticRegression(logistic),
        ));

        info!("Training {}", RANDOM_FOREST);
        let mut forest = RandomForest::new(self.config.random_forest, self.config.random_state);
        forest.fit(x_fit, y_fit)?;
        models.push(NamedModel::new(RANDOM_FOREST, TrainedModel::RandomForest(forest)));

        info!("Training {}", GRADIENT_BOOSTING);
        let mut boosting = GradientBoostingClassifier::new(
            self.config.gradient_boosting.clone(),
            self.config.random_state,
        );
        boosting.fit(x_fit, y_fit)?;
        models.push(NamedModel::new(
            GRADIENT_BOOSTING,
            TrainedModel::GradientBoosting(boosting),
        ));

        info!("Tuning {} with grid search", RANDOM_FOREST);
        let grid_search = GridSearch::new(
            self.config.grid.clone(),
            self.config.cv_folds,
            self.config.random_state,
        )
        .fit(x_fit, y_fit)?;
        let mut tuned = RandomForest::new(grid_search.best_params, self.config.random_state);
        tuned.fit(x_fit, y_fit)?;
        models.push(NamedModel::new(RANDOM_FOREST_TUNED, TrainedModel::RandomForest(tuned)));

        info!(
            models = models.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Training complete"
        );

        Ok(TrainingOutcome {
            models,
            x_test,
            y_test,
            split,
            grid_search,
            n_resampled: y_fit.len(),
        })
    }
}
