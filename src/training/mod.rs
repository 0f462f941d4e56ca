//! Model training module
//!
//! Provides the classifiers compared by the pipeline:
//! - Logistic regression
//! - Decision trees and Random Forests
//! - Gradient boosting
//!
//! plus the stratified split, cross-validation and random forest grid
//! search used to fit them.

mod config;
mod engine;
mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod grid_search;
pub mod linear_models;
pub mod random_forest;

pub use config::{RandomForestGrid, RandomForestParams, TrainingConfig};
pub use cross_validation::{stratified_train_test_split, CVResults, CVSplit, SplitIndices, StratifiedKFold};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use engine::{Trainer, TrainingOutcome};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use grid_search::{CandidateScore, GridSearch, GridSearchResult};
pub use linear_models::LogisticRegression;
pub use models::{
    NamedModel, TrainedModel, GRADIENT_BOOSTING, LOGISTIC_REGRESSION, RANDOM_FOREST,
    RANDOM_FOREST_TUNED,
};
pub use random_forest::RandomForest;
