use thiserror::Error;

use crate::ModelKind;

/// Failure to bring a model into memory.
///
/// Cloneable so a single failed load can be handed to every caller that was
/// waiting on it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("{0} model not found")]
    NotFound(ModelKind),
    #[error("fetching {kind} model failed: {message}")]
    Fetch { kind: ModelKind, message: String },
    #[error("{kind} model artifact is malformed: {message}")]
    Malformed { kind: ModelKind, message: String },
    #[error("loader returned a {got} model when {want} was requested")]
    WrongKind { want: ModelKind, got: ModelKind },
}

/// Failure while running a loaded model.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Frame(#[from] sensor::FrameError),
    #[error("expected {expected} inputs, got {got}")]
    Shape { expected: usize, got: usize },
    #[error("model produced no output")]
    Empty,
    #[error("inference worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
