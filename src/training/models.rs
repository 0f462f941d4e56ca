//! Trained model variants

use super::gradient_boosting::GradientBoostingClassifier;
use super::linear_models::LogisticRegression;
use super::random_forest::RandomForest;
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Display names of the fitted variants
pub const LOGISTIC_REGRESSION: &str = "Logistic Regression";
pub const RANDOM_FOREST: &str = "Random Forest";
pub const GRADIENT_BOOSTING: &str = "Gradient Boosting";
pub const RANDOM_FOREST_TUNED: &str = "Random Forest Tuned";

/// Enum to hold trained model variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoostingClassifier),
}

impl TrainedModel {
    /// Predicted labels in {0, 1}
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::LogisticRegression(m) => m.predict(x),
            TrainedModel::RandomForest(m) => m.predict(x),
            TrainedModel::GradientBoosting(m) => m.predict(x),
        }
    }

    /// Positive-class probability, when the variant produces one
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        let proba = match self {
            TrainedModel::LogisticRegression(m) => m.predict_proba(x)?,
            TrainedModel::RandomForest(m) => m.predict_proba(x)?,
            TrainedModel::GradientBoosting(m) => m.predict_proba(x)?,
        };
        Ok(Some(proba))
    }

    /// Per-feature importances for tree ensembles
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        match self {
            TrainedModel::LogisticRegression(_) => None,
            TrainedModel::RandomForest(m) => m.feature_importances().cloned(),
            TrainedModel::GradientBoosting(m) => m.feature_importances().cloned(),
        }
    }
}

/// A fitted model tagged with its display name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedModel {
    pub name: String,
    pub model: TrainedModel,
}

impl NamedModel {
    pub fn new(name: impl Into<String>, model: TrainedModel) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::RandomForestParams;
    use ndarray::array;

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = array![[0.0, 1.0], [0.2, 1.1], [0.1, 0.9], [5.0, 4.0], [5.2, 4.1], [4.9, 3.8]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_dispatch() {
        let (x, y) = data();
        let mut lr = LogisticRegression::new();
        lr.fit(&x, &y).unwrap();
        let model = TrainedModel::LogisticRegression(lr);

        assert_eq!(model.predict(&x).unwrap(), y);
        assert!(model.predict_proba(&x).unwrap().is_some());
        assert!(model.feature_importances().is_none());
    }

    #[test]
    fn test_forest_importances_exposed() {
        let (x, y) = data();
        let mut rf = RandomForest::new(RandomForestParams { n_estimators: 5, ..Default::default() }, 3);
        rf.fit(&x, &y).unwrap();
        let named = NamedModel::new(RANDOM_FOREST, TrainedModel::RandomForest(rf));

        assert_eq!(named.name, "Random Forest");
        assert_eq!(named.model.feature_importances().unwrap().len(), 2);
    }

    #[test]
    fn test_restored_model_predicts_same_labels() {
        let (x, y) = data();
        let mut rf = RandomForest::new(RandomForestParams { n_estimators: 3, ..Default::default() }, 1);
        rf.fit(&x, &y).unwrap();
        let model = TrainedModel::RandomForest(rf);

        let json = serde_json::to_string(&model).unwrap();
        let restored: TrainedModel = serde_json::from_str(&json).unwrap();
        assert_eq!(model.predict(&x).unwrap(), restored.predict(&x).unwrap());
    }
}
