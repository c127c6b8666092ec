use tokio::sync::watch;

use crate::mappers::{confidence_ratio, confidence_status};
use crate::signal::{ControlState, DirectionPrediction, ExpressionSignal, TrackingStatus};

/// Consumer of the loops' output. Publishing is fire-and-forget and the
/// latest value wins.
pub trait ControlSignalSink: Send + Sync {
    fn publish_expression(&self, signal: ExpressionSignal);

    fn publish_gesture(&self, prediction: DirectionPrediction);

    /// Control-surface changes, for consumers that render them.
    fn publish_controls(&self, _controls: ControlState) {}
}

/// In-process last-write-wins store backed by [`watch`] channels.
///
/// Readers either poll the current values or subscribe and wait for changes.
pub struct SignalBoard {
    expression: watch::Sender<ExpressionSignal>,
    gesture: watch::Sender<DirectionPrediction>,
    controls: watch::Sender<ControlState>,
}

impl Default for SignalBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalBoard {
    pub fn new() -> Self {
        let (expression, _) = watch::channel(ExpressionSignal::default());
        let (gesture, _) = watch::channel(DirectionPrediction::none());
        let (controls, _) = watch::channel(ControlState::default());
        Self {
            expression,
            gesture,
            controls,
        }
    }

    pub fn expression(&self) -> ExpressionSignal {
        *self.expression.borrow()
    }

    pub fn gesture(&self) -> DirectionPrediction {
        *self.gesture.borrow()
    }

    pub fn controls(&self) -> ControlState {
        *self.controls.borrow()
    }

    /// Current gesture readout.
    pub fn status(&self) -> TrackingStatus {
        let controls = self.controls();
        confidence_status(
            controls.gesture_active,
            self.gesture().confidence,
            controls.confidence_threshold,
        )
    }

    /// Confidence relative to the current threshold, for overlays.
    pub fn confidence_ratio(&self) -> f32 {
        if !self.controls().gesture_active {
            return 0.0;
        }
        confidence_ratio(self.gesture().confidence, self.controls().confidence_threshold)
    }

    pub fn subscribe_expression(&self) -> watch::Receiver<ExpressionSignal> {
        self.expression.subscribe()
    }

    pub fn subscribe_gesture(&self) -> watch::Receiver<DirectionPrediction> {
        self.gesture.subscribe()
    }

    pub fn subscribe_controls(&self) -> watch::Receiver<ControlState> {
        self.controls.subscribe()
    }
}

impl ControlSignalSink for SignalBoard {
    fn publish_expression(&self, signal: ExpressionSignal) {
        self.expression.send_replace(signal);
    }

    fn publish_gesture(&self, prediction: DirectionPrediction) {
        self.gesture.send_replace(prediction);
    }

    fn publish_controls(&self, controls: ControlState) {
        self.controls.send_replace(controls);
    }
}
