use async_trait::async_trait;
use reflex::{
    Direction, LoopError, LoopState, Pipeline, PipelineConfig, SignalBoard, TrackingStatus,
};
use sensor::{Frame, LiveCamera};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use vision::{
    ExpressionModel, ExpressionScores, FeatureExtractor, GestureClassifier, InferenceError,
    LoadError, ModelCache, ModelHandle, ModelKind, ModelLoader, Prediction,
};

struct Furious;

#[async_trait]
impl ExpressionModel for Furious {
    async fn detect(&self, _frame: &Frame) -> Result<Option<ExpressionScores>, InferenceError> {
        Ok(Some(ExpressionScores {
            angry: 0.85,
            ..Default::default()
        }))
    }
}

struct Flat;

#[async_trait]
impl FeatureExtractor for Flat {
    async fn extract(&self, _frame: &Frame) -> Result<Vec<f32>, InferenceError> {
        Ok(vec![0.5])
    }
}

struct Pointing {
    confidence: Mutex<f32>,
}

#[async_trait]
impl GestureClassifier for Pointing {
    async fn classify(&self, _features: &[f32]) -> Result<Prediction, InferenceError> {
        Ok(Prediction {
            label: "up".into(),
            confidence: *self.confidence.lock().unwrap(),
        })
    }
}

/// Loader that fails the first `failures` calls of every kind.
struct Loader {
    classifier: Arc<Pointing>,
    failures: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl ModelLoader for Loader {
    async fn load(&self, kind: ModelKind) -> Result<ModelHandle, LoadError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(LoadError::NotFound(kind));
        }
        Ok(match kind {
            ModelKind::Expression => ModelHandle::Expression(Arc::new(Furious)),
            ModelKind::FeatureExtractor => ModelHandle::FeatureExtractor(Arc::new(Flat)),
            ModelKind::Classifier => ModelHandle::Classifier(self.classifier.clone()),
        })
    }
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..400 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

struct Rig {
    pipeline: Pipeline,
    board: Arc<SignalBoard>,
    camera: Arc<LiveCamera>,
    classifier: Arc<Pointing>,
}

fn rig(failures: usize) -> Rig {
    let camera = Arc::new(LiveCamera::new());
    let classifier = Arc::new(Pointing {
        confidence: Mutex::new(0.42),
    });
    let models = Arc::new(ModelCache::new(Arc::new(Loader {
        classifier: classifier.clone(),
        failures,
        calls: AtomicUsize::new(0),
    })));
    let board = Arc::new(SignalBoard::new());
    let config = PipelineConfig::default().with_period(Duration::from_millis(10));
    let pipeline = Pipeline::new(camera.clone(), models, board.clone(), config);
    Rig {
        pipeline,
        board,
        camera,
        classifier,
    }
}

fn switch_on(camera: &LiveCamera) {
    camera.switch_on();
    camera.push(Frame::new("image/png", vec![0]));
}

#[tokio::test]
async fn initial_controls_are_published() {
    let rig = rig(0);
    let controls = rig.board.controls();
    assert!(!controls.expression_active);
    assert!(!controls.gesture_active);
    assert_eq!(controls.confidence_threshold, 0.6);
    assert_eq!(rig.board.status(), TrackingStatus::Idle);
    assert!(!rig.board.expression().is_model_loaded);
    assert_eq!(rig.board.expression().speed_multiplier, 1.0);
}

#[tokio::test]
async fn preload_reports_failure_then_recovers() {
    let rig = rig(1);
    assert!(!rig.pipeline.preload().await);
    assert!(!rig.pipeline.is_expression_model_loaded());
    assert!(!rig.board.expression().is_model_loaded);

    assert!(rig.pipeline.preload().await);
    assert!(rig.pipeline.is_expression_model_loaded());
    let signal = rig.board.expression();
    assert!(signal.is_model_loaded);
    assert!(signal.expression.is_none());
    assert_eq!(signal.speed_multiplier, 1.0);
}

#[tokio::test]
async fn expression_loop_drives_the_board() {
    let rig = rig(0);
    switch_on(&rig.camera);
    rig.pipeline.preload().await;

    rig.pipeline.set_expression_loop_active(true).unwrap();
    assert!(rig.board.controls().expression_active);
    // turning on twice is harmless
    rig.pipeline.set_expression_loop_active(true).unwrap();

    wait_until(|| rig.board.expression().expression.is_some()).await;
    let signal = rig.board.expression();
    assert!((signal.speed_multiplier - 2.0).abs() < 1e-4);
    assert!(signal.is_angry_detected);

    rig.pipeline.set_expression_loop_active(false).unwrap();
    assert!(!rig.board.controls().expression_active);
    rig.pipeline.shutdown().await;
    assert_eq!(rig.pipeline.expression_state(), LoopState::Idle);
}

#[tokio::test]
async fn camera_off_leaves_controls_untouched() {
    let rig = rig(0);
    assert_eq!(
        rig.pipeline.set_expression_loop_active(true),
        Err(LoopError::CameraOff)
    );
    assert!(!rig.board.controls().expression_active);
    assert_eq!(rig.pipeline.expression_state(), LoopState::Idle);
}

#[tokio::test]
async fn gesture_needs_trained_models() {
    let rig = rig(0);
    switch_on(&rig.camera);
    assert_eq!(
        rig.pipeline.set_gesture_loop_active(true),
        Err(LoopError::NoClassifier)
    );
    assert!(!rig.board.controls().gesture_active);

    rig.pipeline.load_gesture_models().await.unwrap();
    rig.pipeline.set_gesture_loop_active(true).unwrap();
    assert_eq!(rig.pipeline.gesture_state(), LoopState::Running);
    rig.pipeline.shutdown().await;
}

#[tokio::test]
async fn status_follows_confidence_and_threshold() {
    let rig = rig(0);
    switch_on(&rig.camera);
    rig.pipeline.load_gesture_models().await.unwrap();
    rig.pipeline.set_gesture_loop_active(true).unwrap();

    wait_until(|| rig.board.gesture().label == Some(Direction::Up)).await;
    assert_eq!(rig.board.status(), TrackingStatus::Scanning);
    assert!((rig.board.confidence_ratio() - 0.7).abs() < 1e-4);

    *rig.classifier.confidence.lock().unwrap() = 0.65;
    wait_until(|| rig.board.gesture().confidence > 0.6).await;
    assert_eq!(rig.board.status(), TrackingStatus::Tracking);
    assert_eq!(rig.board.confidence_ratio(), 1.0);

    // raising the bar drops back to scanning without a new prediction
    assert_eq!(rig.pipeline.set_gesture_confidence_threshold(0.8), 0.8);
    assert_eq!(rig.board.status(), TrackingStatus::Scanning);

    rig.pipeline.set_gesture_loop_active(false).unwrap();
    assert_eq!(rig.board.status(), TrackingStatus::Idle);
    rig.pipeline.shutdown().await;
    assert!(rig.board.gesture().is_none());
    assert_eq!(rig.pipeline.gesture_state(), LoopState::Idle);
}

#[tokio::test]
async fn threshold_is_clamped() {
    let rig = rig(0);
    assert_eq!(rig.pipeline.set_gesture_confidence_threshold(0.3), 0.5);
    assert_eq!(rig.board.controls().confidence_threshold, 0.5);
    assert_eq!(rig.pipeline.set_gesture_confidence_threshold(0.99), 0.95);
    assert_eq!(rig.pipeline.controls().confidence_threshold, 0.95);
    assert_eq!(rig.pipeline.set_gesture_confidence_threshold(0.75), 0.75);
}

#[tokio::test]
async fn shutdown_stops_both_loops() {
    let rig = rig(0);
    switch_on(&rig.camera);
    rig.pipeline.load_gesture_models().await.unwrap();
    rig.pipeline.set_expression_loop_active(true).unwrap();
    rig.pipeline.set_gesture_loop_active(true).unwrap();

    rig.pipeline.shutdown().await;
    assert_eq!(rig.pipeline.expression_state(), LoopState::Idle);
    assert_eq!(rig.pipeline.gesture_state(), LoopState::Idle);
    let controls = rig.board.controls();
    assert!(!controls.expression_active && !controls.gesture_active);
}
