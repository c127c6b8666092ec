use thiserror::Error;

/// Why a loop refused to start.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum LoopError {
    #[error("camera is off")]
    CameraOff,
    #[error("no trained gesture classifier is loaded")]
    NoClassifier,
    #[error("loop is already running")]
    AlreadyRunning,
}
