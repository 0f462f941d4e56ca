//! SMOTE oversampling

use crate::error::{PipelineError, Result};
use crate::synthetic::{class_counts, class_indices, ResampleResult, Sampler};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// SMOTE (Synthetic Minority Over-sampling Technique).
///
/// Every class below the majority count is grown to it by interpolating
/// between a sample and one of its `k` nearest same-class neighbours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SMOTE {
    /// Number of nearest neighbors
    k_neighbors: usize,
    /// Random seed
    seed: u64,
    /// Target samples per class
    target_counts: Option<BTreeMap<i64, usize>>,
}

impl SMOTE {
    /// Create new SMOTE sampler
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            seed: 42,
            target_counts: None,
        }
    }

    /// Set number of neighbors
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).powi(2)).sum()
    }

    /// The `k` nearest rows to `rows[point]` among `rows`, excluding the
    /// point itself. Equal distances keep row order.
    fn find_neighbors(x: &Array2<f64>, rows: &[usize], point: usize, k: usize) -> Vec<usize> {
        let origin = x.row(rows[point]);
        let mut dists: Vec<(f64, usize)> = rows
            .iter()
            .enumerate()
            .filter(|(pos, _)| *pos != point)
            .map(|(pos, &row)| (Self::squared_distance(origin, x.row(row)), pos))
            .collect();
        dists.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        dists.into_iter().take(k).map(|(_, pos)| pos).collect()
    }
}

impl Default for SMOTE {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for SMOTE {
    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let counts = class_counts(y);

        if counts.len() < 2 {
            return Err(PipelineError::ValidationError(
                "Need at least 2 classes for SMOTE".to_string(),
            ));
        }

        let max_count = counts.values().copied().max().unwrap_or(0);
        self.target_counts = Some(counts.keys().map(|&class| (class, max_count)).collect());
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<ResampleResult> {
        let targets = self
            .target_counts
            .as_ref()
            .ok_or(PipelineError::ModelNotFitted)?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let indices = class_indices(y);
        let n_features = x.ncols();

        let mut synthetic_x: Vec<f64> = Vec::new();
        let mut synthetic_y: Vec<f64> = Vec::new();
        let mut n_synthetic = BTreeMap::new();

        for (&class, &target_count) in targets {
            let rows = match indices.get(&class) {
                Some(rows) => rows,
                None => continue,
            };
            let n_to_generate = target_count.saturating_sub(rows.len());
            n_synthetic.insert(class, n_to_generate);
            if n_to_generate == 0 {
                continue;
            }

            // A lone sample has no neighbour to interpolate towards
            if rows.len() == 1 {
                for _ in 0..n_to_generate {
                    synthetic_x.extend(x.row(rows[0]).iter().copied());
                    synthetic_y.push(class as f64);
                }
                continue;
            }

            let k = self.k_neighbors.min(rows.len() - 1);
            let neighbors: Vec<Vec<usize>> = (0..rows.len())
                .map(|point| Self::find_neighbors(x, rows, point, k))
                .collect();

            for _ in 0..n_to_generate {
                let point = rng.gen_range(0..rows.len());
                let neighbor = neighbors[point][rng.gen_range(0..k)];
                let gap: f64 = rng.gen();

                let sample = x.row(rows[point]);
                let other = x.row(rows[neighbor]);
                synthetic_x.extend(
                    sample
                        .iter()
                        .zip(other.iter())
                        .map(|(&p, &n)| p + gap * (n - p)),
                );
                synthetic_y.push(class as f64);
            }
            debug!(class, generated = n_to_generate, k, "Generated synthetic samples");
        }

        let n_new = synthetic_y.len();
        let synthetic = Array2::from_shape_vec((n_new, n_features), synthetic_x)?;
        let result_x = ndarray::concatenate(Axis(0), &[x.view(), synthetic.view()])?;

        let mut all_y: Vec<f64> = y.to_vec();
        all_y.extend_from_slice(&synthetic_y);

        info!(
            original = x.nrows(),
            synthetic = n_new,
            "SMOTE resampling complete"
        );

        Ok(ResampleResult {
            x: result_x,
            y: Array1::from_vec(all_y),
            n_synthetic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn imbalanced() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.2],
            [0.2, 0.1],
            [0.3, 0.3],
            [0.4, 0.2],
            [0.5, 0.5],
            [5.0, 5.0],
            [5.5, 5.2],
            [6.0, 5.9],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_smote_balances_classes() {
        let (x, y) = imbalanced();
        let result = SMOTE::new().with_seed(42).fit_resample(&x, &y).unwrap();

        let counts = class_counts(&result.y);
        assert_eq!(counts[&0], 6);
        assert_eq!(counts[&1], 6);
        assert_eq!(result.n_synthetic[&1], 3);
        assert_eq!(result.x.nrows(), result.y.len());
    }

    #[test]
    fn test_smote_preserves_original() {
        let (x, y) = imbalanced();
        let result = SMOTE::new().fit_resample(&x, &y).unwrap();

        for i in 0..x.nrows() {
            assert_eq!(result.x.row(i), x.row(i));
            assert_eq!(result.y[i], y[i]);
        }
    }

    #[test]
    fn test_synthetic_samples_between_minority_points() {
        let (x, y) = imbalanced();
        let result = SMOTE::new().fit_resample(&x, &y).unwrap();

        for row in result.x.rows().into_iter().skip(x.nrows()) {
            assert!(row[0] >= 5.0 && row[0] <= 6.0);
            assert!(row[1] >= 5.0 && row[1] <= 5.9);
        }
    }

    #[test]
    fn test_smote_deterministic() {
        let (x, y) = imbalanced();
        let a = SMOTE::new().with_seed(7).fit_resample(&x, &y).unwrap();
        let b = SMOTE::new().with_seed(7).fit_resample(&x, &y).unwrap();
        assert_eq!(a.x, b.x);
    }

    #[test]
    fn test_single_minority_sample_duplicated() {
        let x = array![[0.0], [1.0], [2.0], [9.0]];
        let y = array![0.0, 0.0, 0.0, 1.0];
        let result = SMOTE::new().fit_resample(&x, &y).unwrap();

        assert_eq!(result.x.nrows(), 6);
        assert_eq!(result.x[[5, 0]], 9.0);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = array![[0.0], [1.0]];
        let y = array![1.0, 1.0];
        assert!(SMOTE::new().fit_resample(&x, &y).is_err());
    }
}
