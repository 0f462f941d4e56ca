//! Decision tree implementation

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        /// Share of label-1 samples for classifiers, the mean for regressors
        probability: f64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    /// Gini impurity over binary {0, 1} labels
    Gini,
    /// Mean squared error (regression)
    MSE,
}

/// Running label statistics for one side of a split
#[derive(Debug, Clone, Copy, Default)]
struct NodeStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
}

impl NodeStats {
    fn push(&mut self, y: f64) {
        self.count += 1;
        self.sum += y;
        self.sq_sum += y * y;
    }

    fn minus(&self, other: &NodeStats) -> NodeStats {
        NodeStats {
            count: self.count - other.count,
            sum: self.sum - other.sum,
            sq_sum: self.sq_sum - other.sq_sum,
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.mean();
        match criterion {
            // with labels in {0, 1}, gini = 1 - p^2 - (1-p)^2
            Criterion::Gini => 2.0 * mean * (1.0 - mean),
            Criterion::MSE => (self.sq_sum / self.count as f64 - mean * mean).max(0.0),
        }
    }
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn at each node (all when None)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for the per-node feature draw
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    fn with_criterion_default(criterion: Criterion) -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion,
            random_state: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Create a new binary classifier tree
    pub fn new_classifier() -> Self {
        Self::with_criterion_default(Criterion::Gini)
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self::with_criterion_default(Criterion::MSE)
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Consider only `n` randomly drawn features at each node
    pub fn with_max_features(mut self, n: usize) -> Self {
        self.max_features = Some(n.max(1));
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn is_classification(&self) -> bool {
        self.criterion == Criterion::Gini
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || n_features == 0 {
            return Err(PipelineError::TrainingError(
                "Cannot fit a tree on an empty matrix".to_string(),
            ));
        }

        self.n_features = n_features;
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut importances = vec![0.0; n_features];

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances, &mut rng));

        // Normalize feature importances
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn node_stats(y: &Array1<f64>, indices: &[usize]) -> NodeStats {
        let mut stats = NodeStats::default();
        for &i in indices {
            stats.push(y[i]);
        }
        stats
    }

    fn make_leaf(&self, stats: &NodeStats) -> TreeNode {
        let mean = stats.mean();
        let value = if self.is_classification() {
            // ties resolve to class 0
            if mean > 0.5 { 1.0 } else { 0.0 }
        } else {
            mean
        };
        TreeNode::Leaf {
            value,
            probability: mean,
            n_samples: stats.count,
        }
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let stats = Self::node_stats(y, indices);
        let parent_impurity = stats.impurity(self.criterion);

        // Check stopping conditions
        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || parent_impurity <= 0.0;

        if should_stop {
            return self.make_leaf(&stats);
        }

        let candidates = self.draw_features(rng);
        let mut best = self.find_best_split(x, y, indices, &candidates, &stats);
        if best.is_none() && candidates.len() < self.n_features {
            // keep searching the undrawn features until a valid split is found
            let rest: Vec<usize> = (0..self.n_features)
                .filter(|f| !candidates.contains(f))
                .collect();
            best = self.find_best_split(x, y, indices, &rest, &stats);
        }
        let (best_feature, best_threshold, best_impurity) = match best {
            Some(best) => best,
            None => return self.make_leaf(&stats),
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, best_feature]] <= best_threshold);

        importances[best_feature] += n_samples as f64 * (parent_impurity - best_impurity);

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: best_feature,
            threshold: best_threshold,
            left,
            right,
            n_samples,
            impurity: parent_impurity,
        }
    }

    /// Feature indices scanned at one node, ascending
    fn draw_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(m) if m < self.n_features => {
                let mut drawn = rand::seq::index::sample(rng, self.n_features, m).into_vec();
                drawn.sort_unstable();
                drawn
            }
            _ => (0..self.n_features).collect(),
        }
    }

    /// Lowest weighted child impurity over the candidate features.
    ///
    /// Returns `(feature, threshold, weighted_impurity)`. Ties keep the
    /// earlier feature.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        candidates: &[usize],
        parent: &NodeStats,
    ) -> Option<(usize, f64, f64)> {
        let parent_impurity = parent.impurity(self.criterion);

        // Each feature independently finds its best split
        let feature_results: Vec<Option<(usize, f64, f64)>> = candidates
            .par_iter()
            .map(|&feature_idx| {
                self.best_threshold(x, y, indices, feature_idx, parent)
                    .map(|(threshold, impurity)| (feature_idx, threshold, impurity))
            })
            .collect();

        let mut best: Option<(usize, f64, f64)> = None;
        for result in feature_results.into_iter().flatten() {
            if result.2 < parent_impurity && best.map_or(true, |b| result.2 < b.2) {
                best = Some(result);
            }
        }
        best
    }

    /// Sorted sweep over one feature's values
    fn best_threshold(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature_idx: usize,
        parent: &NodeStats,
    ) -> Option<(f64, f64)> {
        let mut points: Vec<(f64, f64)> = indices.iter().map(|&i| (x[[i, feature_idx]], y[i])).collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = points.len() as f64;
        let mut left = NodeStats::default();
        let mut best: Option<(f64, f64)> = None;

        for pos in 0..points.len() - 1 {
            left.push(points[pos].1);
            let (current, next) = (points[pos].0, points[pos + 1].0);
            if current == next {
                continue;
            }

            let right = parent.minus(&left);
            if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                continue;
            }

            let weighted = (left.count as f64 * left.impurity(self.criterion)
                + right.count as f64 * right.impurity(self.criterion))
                / n;

            if best.map_or(true, |(_, b)| weighted < b) {
                let mut threshold = (current + next) / 2.0;
                if threshold >= next {
                    threshold = current;
                }
                best = Some((threshold, weighted));
            }
        }

        best
    }

    fn root(&self) -> Result<&TreeNode> {
        self.root.as_ref().ok_or(PipelineError::ModelNotFitted)
    }

    fn leaf_for<'a>(node: &'a TreeNode, sample: ArrayView1<f64>) -> &'a TreeNode {
        let mut node = node;
        loop {
            match node {
                TreeNode::Leaf { .. } => return node,
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    node = if sample[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root()?;
        self.check_width(x)?;
        Ok(x.outer_iter()
            .map(|row| match Self::leaf_for(root, row) {
                TreeNode::Leaf { value, .. } => *value,
                TreeNode::Split { .. } => unreachable!(),
            })
            .collect())
    }

    /// Leaf probability of label 1 for each row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root()?;
        self.check_width(x)?;
        Ok(x.outer_iter()
            .map(|row| match Self::leaf_for(root, row) {
                TreeNode::Leaf { probability, .. } => *probability,
                TreeNode::Split { .. } => unreachable!(),
            })
            .collect())
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        match &self.root {
            None => 0,
            Some(node) => Self::node_depth(node),
        }
    }

    fn node_depth(node: &TreeNode) -> usize {
        match node {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + Self::node_depth(left).max(Self::node_depth(right)),
        }
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        match &self.root {
            None => 0,
            Some(node) => Self::count_leaves(node),
        }
    }

    fn count_leaves(node: &TreeNode) -> usize {
        match node {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => Self::count_leaves(left) + Self::count_leaves(right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [1.0, 9.0],
            [2.0, 3.0],
            [3.0, 7.0],
            [4.0, 1.0],
            [6.0, 2.0],
            [7.0, 8.0],
            [8.0, 4.0],
            [9.0, 6.0],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_classifier_fits_separable_data() {
        let (x, y) = separable();
        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.get_depth(), 2);
        assert_eq!(tree.get_n_leaves(), 2);

        let importances = tree.feature_importances().unwrap();
        assert!((importances[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_is_midpoint() {
        let (x, y) = separable();
        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        match tree.root.as_ref().unwrap() {
            TreeNode::Split { feature_idx, threshold, .. } => {
                assert_eq!(*feature_idx, 0);
                assert_eq!(*threshold, 5.0);
            }
            TreeNode::Leaf { .. } => panic!("expected a split"),
        }
    }

    #[test]
    fn test_max_depth_zero_gives_probability_leaf() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 1.0, 1.0, 1.0];
        let mut tree = DecisionTree::new_classifier().with_max_depth(Some(0));
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict_proba(&x).unwrap(), array![0.75, 0.75, 0.75, 0.75]);
        assert_eq!(tree.predict(&x).unwrap(), array![1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_regressor_mean_leaves() {
        let x = array![[1.0], [2.0], [10.0], [11.0]];
        let y = array![1.0, 3.0, 10.0, 12.0];
        let mut tree = DecisionTree::new_regressor().with_max_depth(Some(1));
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), array![2.0, 2.0, 11.0, 11.0]);
    }

    #[test]
    fn test_feature_subset_deterministic() {
        let (x, y) = separable();
        let fit = |seed| {
            let mut tree = DecisionTree::new_classifier()
                .with_max_features(1)
                .with_random_state(seed);
            tree.fit(&x, &y).unwrap();
            tree.predict_proba(&x).unwrap()
        };
        assert_eq!(fit(3), fit(3));
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTree::new_classifier();
        assert!(matches!(
            tree.predict(&array![[1.0]]),
            Err(PipelineError::ModelNotFitted)
        ));
    }
}
