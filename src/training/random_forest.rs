//! Bagged classification trees

use super::config::RandomForestParams;
use super::decision_tree::DecisionTree;
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random forest classifier.
///
/// Every tree sees a bootstrap sample of the rows and `sqrt(n_features)`
/// candidate features per split. Tree seeds are drawn up front from one
/// seeded generator, so the fitted forest does not depend on thread
/// scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    params: RandomForestParams,
    seed: u64,
    trees: Vec<DecisionTree>,
    importances: Option<Array1<f64>>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(RandomForestParams::default(), 42)
    }
}

impl RandomForest {
    pub fn new(params: RandomForestParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            trees: Vec::new(),
            importances: None,
        }
    }

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
                "Cannot fit a forest on zero rows".to_string(),
            ));
        }
        if self.params.n_estimators == 0 {
            return Err(PipelineError::ValidationError(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        let split_features = ((n_features as f64).sqrt() as usize).max(1);
        let mut master = ChaCha8Rng::seed_from_u64(self.seed);
        let tree_seeds: Vec<u64> = (0..self.params.n_estimators).map(|_| master.gen()).collect();

        let params = self.params;
        self.trees = tree_seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let rows: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();

                let mut tree = DecisionTree::new_classifier()
                    .with_max_depth(params.max_depth)
                    .with_min_samples_split(params.min_samples_split)
                    .with_max_features(split_features)
                    .with_random_state(rng.gen());
                tree.fit(&x.select(Axis(0), &rows), &y.select(Axis(0), &rows))?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.importances = Some(self.mean_importances(n_features));
        Ok(self)
    }

    /// Per-tree importances averaged, then rescaled to sum to one
    fn mean_importances(&self, n_features: usize) -> Array1<f64> {
        let mut sum = Array1::<f64>::zeros(n_features);
        for imp in self.trees.iter().filter_map(DecisionTree::feature_importances) {
            sum += imp;
        }
        let total = sum.sum();
        if total > 0.0 {
            sum /= total;
        }
        sum
    }

    /// Share of trees voting for label 1, weighted by leaf purity
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }

        let per_tree = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_proba(x))
            .collect::<Result<Vec<_>>>()?;

        let sum = per_tree
            .into_iter()
            .fold(Array1::<f64>::zeros(x.nrows()), |acc, p| acc + p);
        Ok(sum / self.trees.len() as f64)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.importances.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn params(n_estimators: usize) -> RandomForestParams {
        RandomForestParams {
            n_estimators,
            ..RandomForestParams::default()
        }
    }

    /// Short and long lead times with a noise column
    fn bookings() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [2.0, 80.0, 0.0],
            [5.0, 95.0, 1.0],
            [1.0, 70.0, 0.0],
            [7.0, 110.0, 1.0],
            [3.0, 85.0, 0.0],
            [180.0, 90.0, 1.0],
            [240.0, 75.0, 0.0],
            [200.0, 100.0, 1.0],
            [310.0, 88.0, 0.0],
            [150.0, 92.0, 1.0],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_forest_separates_lead_times() {
        let (x, y) = bookings();
        let mut rf = RandomForest::new(params(20), 42);
        rf.fit(&x, &y).unwrap();

        let new = array![[4.0, 90.0, 1.0], [260.0, 90.0, 0.0]];
        assert_eq!(rf.predict(&new).unwrap(), array![0.0, 1.0]);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = bookings();
        let run = |seed| {
            let mut rf = RandomForest::new(params(10), seed);
            rf.fit(&x, &y).unwrap();
            rf.predict_proba(&x).unwrap()
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn test_importances_sum_to_one() {
        let (x, y) = bookings();
        let mut rf = RandomForest::new(params(10), 1);
        rf.fit(&x, &y).unwrap();

        let imp = rf.feature_importances().unwrap();
        assert_eq!(imp.len(), 3);
        assert!((imp.sum() - 1.0).abs() < 1e-9);
        assert!(imp[0] > imp[2]);
    }

    #[test]
    fn test_unfitted_and_empty() {
        let rf = RandomForest::new(params(5), 0);
        assert!(matches!(
            rf.predict(&array![[1.0, 2.0, 3.0]]),
            Err(PipelineError::ModelNotFitted)
        ));

        let mut rf = RandomForest::new(params(0), 0);
        let (x, y) = bookings();
        assert!(rf.fit(&x, &y).is_err());
    }
}
