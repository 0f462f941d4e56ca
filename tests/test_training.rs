//! Integration tests for splitting, resampling, training and evaluation

use hotel_cancellation::evaluation::{EvaluationReport, EvaluationRow, Evaluator};
use hotel_cancellation::synthetic::{class_counts, Sampler, SMOTE};
use hotel_cancellation::training::{
    stratified_train_test_split, GridSearch, RandomForestGrid, Trainer, TrainingConfig,
    GRADIENT_BOOSTING, LOGISTIC_REGRESSION, RANDOM_FOREST, RANDOM_FOREST_TUNED,
};
use hotel_cancellation::visualization::NullPlotSink;
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Two separable clusters: 40 negatives around 0, 10 positives around 5
fn clusters() -> (Array2<f64>, Array1<f64>) {
    let mut x = Vec::new();
    let mut y = Vec::new();
    for i in 0..50 {
        let positive = i % 5 == 0;
        let base = if positive { 5.0 } else { 0.0 };
        x.push(base + (i % 7) as f64 * 0.1);
        x.push(base - (i % 3) as f64 * 0.2);
        y.push(if positive { 1.0 } else { 0.0 });
    }
    (Array2::from_shape_vec((50, 2), x).unwrap(), Array1::from_vec(y))
}

fn row(model: &str, f1: f64) -> EvaluationRow {
    EvaluationRow {
        model: model.to_string(),
        accuracy: 0.9,
        precision: 0.8,
        recall: 0.7,
        f1,
        roc_auc: 0.85,
    }
}

// ============================================================================
// Split and resampling
// ============================================================================

#[test]
fn test_split_preserves_class_ratio() {
    let (_, y) = clusters();
    let split = stratified_train_test_split(&y, 0.2, 42).unwrap();

    assert_eq!(split.test.len(), 10);
    assert_eq!(split.train.len(), 40);

    let test_pos = split.test.iter().filter(|&&i| y[i] == 1.0).count();
    let train_pos = split.train.iter().filter(|&&i| y[i] == 1.0).count();
    assert_eq!(test_pos, 2);
    assert_eq!(train_pos, 8);

    let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
    all.sort_unstable();
    assert_eq!(all, (0..50).collect::<Vec<_>>());
}

#[test]
fn test_smote_balances_training_partition() {
    let (x, y) = clusters();
    let result = SMOTE::new().with_k_neighbors(5).with_seed(42).fit_resample(&x, &y).unwrap();

    let counts = class_counts(&result.y);
    assert_eq!(counts[&0], 40);
    assert_eq!(counts[&1], 40);
    assert_eq!(result.x.nrows(), 80);

    // synthetic positives lie between real positives
    for r in 50..80 {
        assert!(result.x[[r, 0]] >= 5.0 && result.x[[r, 0]] <= 5.6 + 1e-9);
    }
}

#[test]
fn test_smote_single_class_rejected() {
    let x = Array2::zeros((4, 2));
    let y = Array1::zeros(4);
    assert!(SMOTE::new().fit_resample(&x, &y).is_err());
}

// ============================================================================
// Training
// ============================================================================

fn cluster_frame() -> DataFrame {
    let (x, y) = clusters();
    df!(
        "f0" => x.column(0).to_vec(),
        "f1" => x.column(1).to_vec(),
        "booking_status" => y.iter().map(|&v| v as i64).collect::<Vec<_>>(),
    )
    .unwrap()
}

#[test]
fn test_trainer_produces_four_models() {
    let features = vec!["f0".to_string(), "f1".to_string()];
    let config = TrainingConfig::default().with_grid(RandomForestGrid {
        n_estimators: vec![10],
        max_depth: vec![Some(3), None],
        min_samples_split: vec![2],
    });
    let outcome = Trainer::new(config)
        .train(&cluster_frame(), &features, "booking_status")
        .unwrap();

    let names: Vec<&str> = outcome.models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(
        names,
        vec![LOGISTIC_REGRESSION, RANDOM_FOREST, GRADIENT_BOOSTING, RANDOM_FOREST_TUNED]
    );
    assert_eq!(outcome.n_resampled, 64);
    assert_eq!(outcome.grid_search.candidates.len(), 2);

    // separable clusters are learned by every model
    let evaluation = Evaluator::new(features)
        .evaluate(&outcome.models, &outcome.x_test, &outcome.y_test, &mut NullPlotSink)
        .unwrap();
    for r in &evaluation.report.rows {
        assert_eq!(r.f1, 1.0, "{} failed on separable data", r.model);
        assert_eq!(r.roc_auc, 1.0);
    }
    assert_eq!(evaluation.best_name, LOGISTIC_REGRESSION);
}

#[test]
fn test_grid_search_scores_every_candidate() {
    let (x, y) = clusters();
    let grid = RandomForestGrid {
        n_estimators: vec![5, 10],
        max_depth: vec![Some(2)],
        min_samples_split: vec![2, 5],
    };
    let result = GridSearch::new(grid.clone(), 3, 42).fit(&x, &y).unwrap();

    assert_eq!(result.candidates.len(), 4);
    let order: Vec<_> = result.candidates.iter().map(|c| c.params).collect();
    assert_eq!(order, grid.candidates());
    let best_mean = result
        .candidates
        .iter()
        .map(|c| c.cv.mean_score)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(result.best_score, best_mean);
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_best_model_is_strictly_highest_f1() {
    let report = EvaluationReport {
        rows: vec![
            row(LOGISTIC_REGRESSION, 0.60),
            row(RANDOM_FOREST, 0.72),
            row(GRADIENT_BOOSTING, 0.72),
            row(RANDOM_FOREST_TUNED, 0.70),
        ],
    };
    assert_eq!(report.best_index(), Some(1));
    assert!(EvaluationReport::default().best_index().is_none());
}
