use async_trait::async_trait;

use crate::Frame;

/// Anything that can produce a still [`Frame`] when asked.
///
/// Implementations must tolerate being polled by several consumers at once;
/// each capture is an independent snapshot.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Grab the current frame, or `None` if the camera is off or not ready.
    async fn capture(&self) -> Option<Frame>;

    /// Whether the camera is switched on and able to produce frames.
    fn is_available(&self) -> bool;
}
