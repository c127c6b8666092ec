//! Inference models for the camera controls.
//!
//! Models are fetched by [`ModelKind`] from a [`ModelSource`], decoded by a
//! [`ModelLoader`] and kept in a [`ModelCache`] that loads each kind at most
//! once at a time no matter how many callers ask for it.

pub mod cache;
pub mod dense;
pub mod error;
pub mod expression;
pub mod gesture;
pub mod kind;
pub mod loader;
pub mod preprocess;
pub mod source;

pub use cache::ModelCache;
pub use error::{InferenceError, LoadError};
pub use expression::{DenseExpressionModel, Expression, ExpressionModel, ExpressionScores};
pub use gesture::{DenseFeatureExtractor, FeatureExtractor, GestureClassifier, Prediction, SoftmaxClassifier};
pub use kind::ModelKind;
pub use loader::{ArtifactLoader, ModelHandle, ModelLoader};
pub use source::{DirSource, HttpSource, ModelSource};
