use async_trait::async_trait;
use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};
use tracing::{debug, info};

use crate::{Frame, FrameSource};

/// Latest-frame slot fed by whatever owns the real webcam.
///
/// The host pushes frames as they arrive and flips the camera on or off;
/// readers always get a copy of the most recent frame.
#[derive(Debug, Default)]
pub struct LiveCamera {
    on: AtomicBool,
    latest: Mutex<Option<Frame>>,
}

impl LiveCamera {
    /// Create a camera that starts switched off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the camera on. Frames pushed afterwards become visible.
    pub fn switch_on(&self) {
        if !self.on.swap(true, Ordering::SeqCst) {
            info!("camera switched on");
        }
    }

    /// Switch the camera off and drop the held frame.
    pub fn switch_off(&self) {
        if self.on.swap(false, Ordering::SeqCst) {
            info!("camera switched off");
        }
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Store `frame` as the latest sample. Returns `false` while the camera is off.
    pub fn push(&self, frame: Frame) -> bool {
        if !self.on.load(Ordering::SeqCst) {
            debug!("dropping frame pushed to a switched-off camera");
            return false;
        }
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
        true
    }
}

#[async_trait]
impl FrameSource for LiveCamera {
    async fn capture(&self) -> Option<Frame> {
        if !self.on.load(Ordering::SeqCst) {
            return None;
        }
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_available(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }
}
