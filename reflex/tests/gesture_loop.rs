use async_trait::async_trait;
use reflex::{
    ControlSignalSink, Direction, DirectionPrediction, ExpressionSignal, GestureLoop, LoopError,
    LoopState, PipelineConfig,
};
use sensor::{Frame, LiveCamera};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vision::{
    FeatureExtractor, GestureClassifier, InferenceError, LoadError, ModelCache, ModelHandle,
    ModelKind, ModelLoader, Prediction,
};

struct Flat;

#[async_trait]
impl FeatureExtractor for Flat {
    async fn extract(&self, _frame: &Frame) -> Result<Vec<f32>, InferenceError> {
        Ok(vec![1.0, 0.0])
    }
}

/// Classifier whose answer the test controls. `None` makes it fail.
#[derive(Default)]
struct Scripted {
    answer: Mutex<Option<(String, f32)>>,
}

impl Scripted {
    fn answer(&self, label: &str, confidence: f32) {
        *self.answer.lock().unwrap() = Some((label.to_string(), confidence));
    }
}

#[async_trait]
impl GestureClassifier for Scripted {
    async fn classify(&self, _features: &[f32]) -> Result<Prediction, InferenceError> {
        match self.answer.lock().unwrap().clone() {
            Some((label, confidence)) => Ok(Prediction { label, confidence }),
            None => Err(InferenceError::Empty),
        }
    }
}

struct Loader {
    classifier: Arc<Scripted>,
}

#[async_trait]
impl ModelLoader for Loader {
    async fn load(&self, kind: ModelKind) -> Result<ModelHandle, LoadError> {
        match kind {
            ModelKind::FeatureExtractor => Ok(ModelHandle::FeatureExtractor(Arc::new(Flat))),
            ModelKind::Classifier => Ok(ModelHandle::Classifier(self.classifier.clone())),
            ModelKind::Expression => Err(LoadError::NotFound(kind)),
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    gestures: Mutex<Vec<DirectionPrediction>>,
}

impl RecordingSink {
    fn last(&self) -> Option<DirectionPrediction> {
        self.gestures.lock().unwrap().last().copied()
    }

    fn count(&self) -> usize {
        self.gestures.lock().unwrap().len()
    }
}

impl ControlSignalSink for RecordingSink {
    fn publish_expression(&self, _signal: ExpressionSignal) {}

    fn publish_gesture(&self, prediction: DirectionPrediction) {
        self.gestures.lock().unwrap().push(prediction);
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
    looper: GestureLoop,
    camera: Arc<LiveCamera>,
    models: Arc<ModelCache>,
    classifier: Arc<Scripted>,
    sink: Arc<RecordingSink>,
}

fn rig() -> Rig {
    let camera = Arc::new(LiveCamera::new());
    camera.switch_on();
    camera.push(Frame::new("image/png", vec![0]));
    let classifier = Arc::new(Scripted::default());
    let models = Arc::new(ModelCache::new(Arc::new(Loader {
        classifier: classifier.clone(),
    })));
    let sink = Arc::new(RecordingSink::default());
    let config = PipelineConfig::default().with_period(Duration::from_millis(10));
    let looper = GestureLoop::new(camera.clone(), models.clone(), sink.clone(), &config);
    Rig {
        looper,
        camera,
        models,
        classifier,
        sink,
    }
}

#[tokio::test]
async fn refuses_to_start_without_a_classifier() {
    let rig = rig();
    assert_eq!(rig.looper.start(), Err(LoopError::NoClassifier));
    assert_eq!(rig.looper.state(), LoopState::Idle);
    assert_eq!(rig.sink.count(), 0);
}

#[tokio::test]
async fn refuses_to_start_with_camera_off() {
    let rig = rig();
    rig.models.ensure_loaded(ModelKind::Classifier).await.unwrap();
    rig.camera.switch_off();
    assert_eq!(rig.looper.start(), Err(LoopError::CameraOff));
    assert_eq!(rig.looper.state(), LoopState::Idle);
}

#[tokio::test]
async fn publishes_classified_direction() {
    let rig = rig();
    rig.models.ensure_loaded(ModelKind::Classifier).await.unwrap();
    rig.classifier.answer("left", 0.8);

    rig.looper.start().unwrap();
    wait_until(|| rig.sink.last().is_some_and(|p| !p.is_none())).await;
    let published = rig.sink.last().unwrap();
    assert_eq!(published.label, Some(Direction::Left));
    assert!((published.confidence - 0.8).abs() < 1e-6);
    rig.looper.finish().await;
}

#[tokio::test]
async fn failed_tick_publishes_none() {
    let rig = rig();
    rig.models.ensure_loaded(ModelKind::Classifier).await.unwrap();
    rig.classifier.answer("up", 0.9);

    rig.looper.start().unwrap();
    wait_until(|| rig.sink.last().is_some_and(|p| p.label == Some(Direction::Up))).await;

    *rig.classifier.answer.lock().unwrap() = None;
    wait_until(|| rig.sink.last().is_some_and(|p| p.is_none())).await;
    assert_eq!(rig.looper.state(), LoopState::Running);
    rig.looper.finish().await;
}

#[tokio::test]
async fn unknown_label_publishes_none() {
    let rig = rig();
    rig.models.ensure_loaded(ModelKind::Classifier).await.unwrap();
    rig.classifier.answer("sideways", 0.99);

    rig.looper.start().unwrap();
    wait_until(|| rig.sink.count() >= 3).await;
    rig.looper.finish().await;
    assert!(rig.sink.gestures.lock().unwrap().iter().all(|p| p.is_none()));
}

#[tokio::test]
async fn missing_frame_publishes_none() {
    let rig = rig();
    rig.models.ensure_loaded(ModelKind::Classifier).await.unwrap();
    rig.classifier.answer("down", 0.9);

    rig.looper.start().unwrap();
    wait_until(|| rig.sink.last().is_some_and(|p| p.label == Some(Direction::Down))).await;
    // switching off drops the held frame but the run keeps ticking
    rig.camera.switch_off();
    wait_until(|| rig.sink.last().is_some_and(|p| p.is_none())).await;
    rig.looper.finish().await;
}

#[tokio::test]
async fn stopping_clears_the_readout() {
    let rig = rig();
    rig.models.ensure_loaded(ModelKind::Classifier).await.unwrap();
    rig.classifier.answer("right", 0.7);

    rig.looper.start().unwrap();
    wait_until(|| rig.sink.last().is_some_and(|p| !p.is_none())).await;
    rig.looper.finish().await;

    assert_eq!(rig.looper.state(), LoopState::Idle);
    assert_eq!(rig.sink.last(), Some(DirectionPrediction::none()));
    let published = rig.sink.count();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(rig.sink.count(), published);
}

#[tokio::test]
async fn can_be_restarted_after_stop() {
    let rig = rig();
    rig.models.ensure_loaded(ModelKind::Classifier).await.unwrap();
    rig.classifier.answer("up", 0.9);

    rig.looper.start().unwrap();
    rig.looper.stop();
    rig.looper.start().unwrap();
    wait_until(|| rig.sink.last().is_some_and(|p| !p.is_none())).await;
    assert_eq!(rig.looper.state(), LoopState::Running);
    rig.looper.finish().await;
    assert_eq!(rig.looper.state(), LoopState::Idle);
}
