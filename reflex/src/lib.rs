//! Real-time camera control loops.
//!
//! Two independently scheduled loops share one camera and one model cache:
//! the [`ExpressionLoop`] turns facial expression into a game speed
//! multiplier, and the [`GestureLoop`] turns learned hand poses into
//! directions. Both publish into a [`ControlSignalSink`]. The [`Pipeline`]
//! owns everything and exposes the control surface.

pub mod config;
pub mod error;
pub mod expression;
pub mod gesture;
pub mod lifecycle;
pub mod mappers;
pub mod pipeline;
pub mod signal;
pub mod sink;

pub use config::PipelineConfig;
pub use error::LoopError;
pub use expression::ExpressionLoop;
pub use gesture::GestureLoop;
pub use lifecycle::LoopState;
pub use pipeline::Pipeline;
pub use signal::{ControlState, Direction, DirectionPrediction, ExpressionSignal, TrackingStatus};
pub use sink::{ControlSignalSink, SignalBoard};
pub use vision::{Expression, ExpressionScores};
