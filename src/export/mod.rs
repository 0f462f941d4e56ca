//! Model export and serialization module
//!
//! The best model of a run is written as a portable JSON artifact that
//! bundles the fitted preprocessing state.

mod artifact;

pub use artifact::{find_best_artifact, ModelArtifact, ARTIFACT_PREFIX};
