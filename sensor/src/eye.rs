use async_trait::async_trait;
use glob::glob;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;
use tracing::warn;

use crate::{Frame, FrameSource};

/// Reads image files from disk as simulated webcam frames.
///
/// Each capture returns the next file matching the pattern, wrapping around
/// at the end.
pub struct FolderCamera {
    paths: Vec<PathBuf>,
    index: AtomicUsize,
}

impl FolderCamera {
    /// Create a new camera that cycles files matching `pattern`.
    pub fn new(pattern: &str) -> crate::Result<Self> {
        let mut paths: Vec<PathBuf> = glob(pattern)?.filter_map(Result::ok).collect();
        paths.sort();
        Ok(Self {
            paths,
            index: AtomicUsize::new(0),
        })
    }

    /// Number of frames available for replay.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the pattern matched nothing.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}

#[async_trait]
impl FrameSource for FolderCamera {
    async fn capture(&self) -> Option<Frame> {
        if self.paths.is_empty() {
            return None;
        }
        let index = self.index.fetch_add(1, Ordering::Relaxed) % self.paths.len();
        let path = &self.paths[index];
        match fs::read(path).await {
            Ok(bytes) => Some(Frame::new(mime_for(path), bytes)),
            Err(e) => {
                warn!(path = %path.display(), "eye failed reading frame: {e}");
                None
            }
        }
    }

    fn is_available(&self) -> bool {
        !self.paths.is_empty()
    }
}
