//! Stratified splitting and cross-validation

use crate::error::{PipelineError, Result};
use crate::synthetic::class_indices;
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Row indices of a train/test partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// A single cross-validation fold
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified hold-out split.
///
/// The test partition has `ceil(test_size * n)` rows. Each class receives
/// the floor of its proportional share and the rows left over go to the
/// classes with the largest fractional remainders (earlier class on ties).
/// Rows inside a class are shuffled with a seeded `ChaCha8Rng`; both index
/// lists are returned in ascending order.
pub fn stratified_train_test_split(y: &Array1<f64>, test_size: f64, seed: u64) -> Result<SplitIndices> {
    let n = y.len();
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::ValidationError(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    if n < 2 {
        return Err(PipelineError::ValidationError(format!(
            "Need at least 2 rows to split, got {}",
            n
        )));
    }

    let n_test = ((test_size * n as f64).ceil() as usize).clamp(1, n - 1);
    let mut by_class = class_indices(y);

    // floor allocation, then largest remainder
    let mut quotas: Vec<(i64, usize, f64)> = by_class
        .iter()
        .map(|(&class, rows)| {
            let exact = n_test as f64 * rows.len() as f64 / n as f64;
            (class, exact.floor() as usize, exact - exact.floor())
        })
        .collect();

    let allocated: usize = quotas.iter().map(|(_, q, _)| q).sum();
    let mut order: Vec<usize> = (0..quotas.len()).collect();
    order.sort_by(|&a, &b| quotas[b].2.total_cmp(&quotas[a].2).then(a.cmp(&b)));
    for &pos in order.iter().take(n_test.saturating_sub(allocated)) {
        quotas[pos].1 += 1;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);

    for (class, quota, _) in quotas {
        if let Some(rows) = by_class.get_mut(&class) {
            rows.shuffle(&mut rng);
            let quota = quota.min(rows.len());
            test.extend_from_slice(&rows[..quota]);
            train.extend_from_slice(&rows[quota..]);
        }
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(SplitIndices { train, test })
}

/// Stratified K-Fold without shuffling.
///
/// Rows of each class are dealt to the folds round-robin in their original
/// order, so every fold carries roughly the class proportions of `y`.
#[derive(Debug, Clone, Copy)]
pub struct StratifiedKFold {
    n_splits: usize,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate the folds for `y`
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let n_splits = self.n_splits;
        if n_splits < 2 {
            return Err(PipelineError::ValidationError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if y.len() < n_splits {
            return Err(PipelineError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                y.len(),
                n_splits
            )));
        }

        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        for rows in class_indices(y).values() {
            for (i, &idx) in rows.iter().enumerate() {
                folds[i % n_splits].push(idx);
            }
        }
        for fold in &mut folds {
            fold.sort_unstable();
        }

        let splits = (0..n_splits)
            .map(|fold_idx| {
                let test_indices = folds[fold_idx].clone();
                let mut train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                train_indices.sort_unstable();

                CVSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect();

        Ok(splits)
    }
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        if n_folds == 0 {
            return Self {
                scores,
                mean_score: 0.0,
                std_score: 0.0,
                n_folds,
            };
        }
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}
