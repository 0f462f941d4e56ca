//! Inference module
//!
//! Batch prediction on new reservation tables with a persisted model
//! artifact.

mod engine;

pub use engine::{InferenceRunner, CANCELLATION_PROBABILITY, PREDICTED_LABEL, PREDICTED_STATUS};
