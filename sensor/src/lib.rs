//! Camera input for the game.
//!
//! A [`FrameSource`] hands out still [`Frame`]s on demand. Consumers poll it
//! whenever they want a fresh sample; nothing is streamed or retained.

pub mod camera;
pub mod eye;
pub mod frame;
pub mod source;

pub use camera::LiveCamera;
pub use eye::FolderCamera;
pub use frame::{Frame, FrameError};
pub use source::FrameSource;

/// Convenience result type used throughout this crate.
pub type Result<T> = std::result::Result<T, FrameError>;
