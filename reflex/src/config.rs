use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::mappers::{DEFAULT_ANGER_THRESHOLD, DEFAULT_CONFIDENCE_THRESHOLD, clamp_confidence_threshold};

/// Tunables for both loops.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Tick period of the expression loop, in milliseconds.
    pub expression_interval_ms: u64,
    /// Tick period of the gesture loop, in milliseconds.
    pub gesture_interval_ms: u64,
    /// Anger score at which the speed boost starts.
    pub anger_threshold: f32,
    /// Initial gesture confidence threshold.
    pub confidence_threshold: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            expression_interval_ms: 250,
            gesture_interval_ms: 250,
            anger_threshold: DEFAULT_ANGER_THRESHOLD,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

impl PipelineConfig {
    pub fn expression_period(&self) -> Duration {
        Duration::from_millis(self.expression_interval_ms)
    }

    pub fn gesture_period(&self) -> Duration {
        Duration::from_millis(self.gesture_interval_ms)
    }

    /// Same config with both loops ticking every `period`.
    pub fn with_period(mut self, period: Duration) -> Self {
        let ms = period.as_millis().min(u64::MAX as u128) as u64;
        self.expression_interval_ms = ms;
        self.gesture_interval_ms = ms;
        self
    }

    /// The starting confidence threshold, pulled into the allowed range.
    pub fn initial_confidence_threshold(&self) -> f32 {
        clamp_confidence_threshold(self.confidence_threshold)
    }
}
