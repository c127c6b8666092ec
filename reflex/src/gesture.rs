use sensor::FrameSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use vision::{ModelCache, ModelKind};

use crate::lifecycle::{Lifecycle, LoopState, StopSignal};
use crate::{ControlSignalSink, Direction, DirectionPrediction, LoopError, PipelineConfig};

/// Polls the camera, runs the feature extractor and the trained classifier,
/// and publishes the predicted direction.
///
/// Unlike the expression loop, every tick publishes: a failed tick
/// publishes [`DirectionPrediction::none`] so a stale direction never keeps
/// steering. When a run ends the readout is cleared once more.
pub struct GestureLoop {
    ticker: Arc<GestureTicker>,
    lifecycle: Lifecycle,
}

struct GestureTicker {
    camera: Arc<dyn FrameSource>,
    models: Arc<ModelCache>,
    sink: Arc<dyn ControlSignalSink>,
    period: Duration,
}

impl GestureLoop {
    pub fn new(
        camera: Arc<dyn FrameSource>,
        models: Arc<ModelCache>,
        sink: Arc<dyn ControlSignalSink>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            ticker: Arc::new(GestureTicker {
                camera,
                models,
                sink,
                period: config.gesture_period(),
            }),
            lifecycle: Lifecycle::default(),
        }
    }

    /// Arm the loop. Needs the camera on and a trained classifier already in
    /// the model cache.
    pub fn start(&self) -> Result<(), LoopError> {
        if !self.ticker.camera.is_available() {
            return Err(LoopError::CameraOff);
        }
        if !self.ticker.models.is_loaded(ModelKind::Classifier) {
            return Err(LoopError::NoClassifier);
        }
        let ticker = self.ticker.clone();
        self.lifecycle.start(move |stop| ticker.run(stop))?;
        info!(period = ?self.ticker.period, "gesture loop started");
        Ok(())
    }

    /// Request a stop; takes effect at the next tick boundary.
    pub fn stop(&self) {
        self.lifecycle.stop();
    }

    pub fn state(&self) -> LoopState {
        self.lifecycle.state()
    }

    /// Stop and wait until the run has exited and cleared its readout.
    pub async fn finish(&self) {
        self.lifecycle.finish().await;
    }
}

impl GestureTicker {
    async fn run(self: Arc<Self>, mut stop: StopSignal) {
        while !stop.is_stopped() {
            let started = Instant::now();
            let prediction = self.tick().await;
            if stop.is_stopped() {
                break;
            }
            self.sink.publish_gesture(prediction);
            if !stop.pace(started, self.period).await {
                break;
            }
        }
        self.sink.publish_gesture(DirectionPrediction::none());
        info!("gesture loop stopped");
    }

    async fn tick(&self) -> DirectionPrediction {
        let Some(frame) = self.camera.capture().await else {
            debug!("no frame available");
            return DirectionPrediction::none();
        };
        let extractor = match self.models.ensure_loaded(ModelKind::FeatureExtractor).await {
            Ok(handle) => handle.feature_extractor(),
            Err(e) => {
                warn!("feature extractor unavailable: {e}");
                return DirectionPrediction::none();
            }
        };
        let classifier = self
            .models
            .get(ModelKind::Classifier)
            .and_then(|h| h.classifier());
        let (Some(extractor), Some(classifier)) = (extractor, classifier) else {
            warn!("gesture models missing");
            return DirectionPrediction::none();
        };

        let features = match extractor.extract(&frame).await {
            Ok(features) => features,
            Err(e) => {
                warn!("feature extraction failed: {e}");
                return DirectionPrediction::none();
            }
        };
        let prediction = match classifier.classify(&features).await {
            Ok(p) => p,
            Err(e) => {
                warn!("gesture classification failed: {e}");
                return DirectionPrediction::none();
            }
        };
        match prediction.label.parse::<Direction>() {
            Ok(direction) => {
                debug!(%direction, confidence = prediction.confidence, "gesture predicted");
                DirectionPrediction::new(direction, prediction.confidence)
            }
            Err(e) => {
                warn!("{e}");
                DirectionPrediction::none()
            }
        }
    }
}
