use sensor::FrameSource;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use vision::{ModelCache, ModelKind};

use crate::lifecycle::{Lifecycle, LoopState, StopSignal};
use crate::mappers::{is_angry, speed_multiplier};
use crate::{ControlSignalSink, ExpressionSignal, LoopError, PipelineConfig};

/// Polls the camera, scores facial expression and publishes the resulting
/// speed multiplier.
///
/// A tick that sees no frame, no face, or a failing model publishes
/// nothing, so the last published values stay in effect. The one exception
/// is the first time the model becomes available: the last values are
/// republished with `is_model_loaded` set.
pub struct ExpressionLoop {
    ticker: Arc<ExpressionTicker>,
    lifecycle: Lifecycle,
}

struct ExpressionTicker {
    camera: Arc<dyn FrameSource>,
    models: Arc<ModelCache>,
    sink: Arc<dyn ControlSignalSink>,
    period: Duration,
    anger_threshold: f32,
    last: Mutex<ExpressionSignal>,
}

impl ExpressionLoop {
    pub fn new(
        camera: Arc<dyn FrameSource>,
        models: Arc<ModelCache>,
        sink: Arc<dyn ControlSignalSink>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            ticker: Arc::new(ExpressionTicker {
                camera,
                models,
                sink,
                period: config.expression_period(),
                anger_threshold: config.anger_threshold,
                last: Mutex::new(ExpressionSignal::default()),
            }),
            lifecycle: Lifecycle::default(),
        }
    }

    /// Begin ticking. The camera must be on.
    pub fn start(&self) -> Result<(), LoopError> {
        if !self.ticker.camera.is_available() {
            return Err(LoopError::CameraOff);
        }
        let ticker = self.ticker.clone();
        self.lifecycle.start(move |stop| ticker.run(stop))?;
        info!(period = ?self.ticker.period, "expression loop started");
        Ok(())
    }

    /// Request a stop; takes effect at the next tick boundary.
    pub fn stop(&self) {
        self.lifecycle.stop();
    }

    pub fn state(&self) -> LoopState {
        self.lifecycle.state()
    }

    /// Announce that the expression model is in the cache, keeping the last
    /// published scores. Only the first call publishes.
    pub fn mark_model_loaded(&self) {
        self.ticker.mark_model_loaded();
    }

    /// Stop and wait until the in-flight tick, if any, has finished.
    pub async fn finish(&self) {
        self.lifecycle.finish().await;
    }
}

impl ExpressionTicker {
    async fn run(self: Arc<Self>, mut stop: StopSignal) {
        while !stop.is_stopped() {
            let started = Instant::now();
            let signal = self.tick().await;
            if stop.is_stopped() {
                break;
            }
            if let Some(signal) = signal {
                self.publish(signal);
            }
            if !stop.pace(started, self.period).await {
                break;
            }
        }
        info!("expression loop stopped");
    }

    fn publish(&self, signal: ExpressionSignal) {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        *last = signal;
        self.sink.publish_expression(signal);
    }

    fn mark_model_loaded(&self) {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if last.is_model_loaded {
            return;
        }
        last.is_model_loaded = true;
        self.sink.publish_expression(*last);
    }

    async fn tick(&self) -> Option<ExpressionSignal> {
        let Some(frame) = self.camera.capture().await else {
            debug!("no frame available");
            return None;
        };
        let model = match self.models.ensure_loaded(ModelKind::Expression).await {
            Ok(handle) => {
                self.mark_model_loaded();
                handle.expression()?
            }
            Err(e) => {
                warn!("expression model unavailable: {e}");
                return None;
            }
        };
        let scores = match model.detect(&frame).await {
            Ok(Some(scores)) => scores,
            Ok(None) => {
                debug!("no face in frame");
                return None;
            }
            Err(e) => {
                warn!("expression inference failed: {e}");
                return None;
            }
        };

        let anger = scores.anger();
        let speed = speed_multiplier(anger, self.anger_threshold);
        let angry = is_angry(anger, self.anger_threshold);
        if angry {
            info!(anger, speed, "anger detected");
        } else {
            debug!(anger, speed, "expression scored");
        }
        Some(ExpressionSignal {
            expression: Some(scores),
            anger_score: anger,
            speed_multiplier: speed,
            is_model_loaded: true,
            is_angry_detected: angry,
        })
    }
}
