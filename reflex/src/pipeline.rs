use sensor::FrameSource;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info};
use vision::{LoadError, ModelCache, ModelKind};

use crate::mappers::clamp_confidence_threshold;
use crate::{
    ControlSignalSink, ControlState, ExpressionLoop, GestureLoop, LoopError, LoopState,
    PipelineConfig,
};

/// Application root: owns the model cache, both loops and the control
/// surface, and shares the camera and sink with them.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use reflex::{Pipeline, PipelineConfig, SignalBoard};
/// # use sensor::LiveCamera;
/// # use vision::{ArtifactLoader, DirSource, ModelCache};
/// # async fn demo() -> Result<(), reflex::LoopError> {
/// let camera = Arc::new(LiveCamera::new());
/// camera.switch_on();
/// let models = Arc::new(ModelCache::new(Arc::new(ArtifactLoader::new(DirSource::new("models")))));
/// let board = Arc::new(SignalBoard::new());
/// let pipeline = Pipeline::new(camera, models, board.clone(), PipelineConfig::default());
/// pipeline.preload().await;
/// pipeline.set_expression_loop_active(true)?;
/// println!("speed x{}", board.expression().speed_multiplier);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    models: Arc<ModelCache>,
    sink: Arc<dyn ControlSignalSink>,
    expression: ExpressionLoop,
    gesture: GestureLoop,
    controls: Mutex<ControlState>,
}

impl Pipeline {
    pub fn new(
        camera: Arc<dyn FrameSource>,
        models: Arc<ModelCache>,
        sink: Arc<dyn ControlSignalSink>,
        config: PipelineConfig,
    ) -> Self {
        let controls = ControlState {
            confidence_threshold: config.initial_confidence_threshold(),
            ..ControlState::default()
        };
        sink.publish_controls(controls);
        Self {
            expression: ExpressionLoop::new(camera.clone(), models.clone(), sink.clone(), &config),
            gesture: GestureLoop::new(camera, models.clone(), sink.clone(), &config),
            models,
            sink,
            controls: Mutex::new(controls),
        }
    }

    /// Load the expression model ahead of the first tick and publish
    /// `is_model_loaded` once it is in.
    ///
    /// Failure is logged; the loop retries on its own ticks.
    pub async fn preload(&self) -> bool {
        match self.models.ensure_loaded(ModelKind::Expression).await {
            Ok(_) => {
                self.expression.mark_model_loaded();
                true
            }
            Err(e) => {
                error!("failed to preload expression model: {e}");
                false
            }
        }
    }

    /// Load the feature extractor and the trained classifier so the gesture
    /// loop can be armed.
    pub async fn load_gesture_models(&self) -> Result<(), LoadError> {
        let (extractor, classifier) = futures::join!(
            self.models.ensure_loaded(ModelKind::FeatureExtractor),
            self.models.ensure_loaded(ModelKind::Classifier),
        );
        extractor?;
        classifier?;
        info!("gesture models ready");
        Ok(())
    }

    pub fn is_expression_model_loaded(&self) -> bool {
        self.models.is_loaded(ModelKind::Expression)
    }

    pub fn models(&self) -> &Arc<ModelCache> {
        &self.models
    }

    pub fn expression_state(&self) -> LoopState {
        self.expression.state()
    }

    pub fn gesture_state(&self) -> LoopState {
        self.gesture.state()
    }

    pub fn controls(&self) -> ControlState {
        *self.controls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_controls(&self, f: impl FnOnce(&mut ControlState)) {
        let mut controls = self.controls.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut controls);
        self.sink.publish_controls(*controls);
    }

    /// Turn the expression loop on or off. Turning on a running loop is a
    /// no-op.
    pub fn set_expression_loop_active(&self, active: bool) -> Result<(), LoopError> {
        if active {
            match self.expression.start() {
                Ok(()) | Err(LoopError::AlreadyRunning) => {}
                Err(e) => return Err(e),
            }
        } else {
            self.expression.stop();
        }
        self.update_controls(|c| c.expression_active = active);
        Ok(())
    }

    /// Arm or disarm the gesture loop. Turning on a running loop is a no-op.
    pub fn set_gesture_loop_active(&self, active: bool) -> Result<(), LoopError> {
        if active {
            match self.gesture.start() {
                Ok(()) | Err(LoopError::AlreadyRunning) => {}
                Err(e) => return Err(e),
            }
        } else {
            self.gesture.stop();
        }
        self.update_controls(|c| c.gesture_active = active);
        Ok(())
    }

    /// Set the confidence needed for a gesture to count as tracked. Values
    /// outside `[0.5, 0.95]` are clamped; the applied value is returned.
    pub fn set_gesture_confidence_threshold(&self, value: f32) -> f32 {
        let applied = clamp_confidence_threshold(value);
        self.update_controls(|c| c.confidence_threshold = applied);
        applied
    }

    /// Stop both loops and wait for them to exit.
    pub async fn shutdown(&self) {
        self.update_controls(|c| {
            c.expression_active = false;
            c.gesture_active = false;
        });
        futures::join!(self.expression.finish(), self.gesture.finish());
        info!("pipeline shut down");
    }
}
