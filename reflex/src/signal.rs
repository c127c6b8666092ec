use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use vision::ExpressionScores;

use crate::mappers::{DEFAULT_CONFIDENCE_THRESHOLD, MIN_SPEED};

/// What the expression loop publishes after each face it scores.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionSignal {
    /// Every expression score, `None` until a face has been seen.
    pub expression: Option<ExpressionScores>,
    pub anger_score: f32,
    pub speed_multiplier: f32,
    pub is_model_loaded: bool,
    pub is_angry_detected: bool,
}

impl Default for ExpressionSignal {
    fn default() -> Self {
        Self {
            expression: None,
            anger_score: 0.0,
            speed_multiplier: MIN_SPEED,
            is_model_loaded: false,
            is_angry_detected: false,
        }
    }
}

/// Directions the gesture classifier can emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Clockwise rotation from "up", in degrees, for arrow overlays.
    pub fn rotation_degrees(self) -> u16 {
        match self {
            Direction::Up => 0,
            Direction::Right => 90,
            Direction::Down => 180,
            Direction::Left => 270,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownDirection(pub String);

impl fmt::Display for UnknownDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown direction label {:?}", self.0)
    }
}

impl std::error::Error for UnknownDirection {}

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        Direction::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(label))
            .ok_or_else(|| UnknownDirection(s.to_string()))
    }
}

/// Latest gesture reading. A `None` label with zero confidence means there
/// is nothing worth acting on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionPrediction {
    pub label: Option<Direction>,
    pub confidence: f32,
}

impl DirectionPrediction {
    pub fn new(label: Direction, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
        Self {
            label: Some(label),
            confidence,
        }
    }

    /// The "no prediction" reading.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        self.label.is_none()
    }
}

/// Gesture readout as shown to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingStatus {
    /// The gesture loop is off.
    Idle,
    /// Running, but confidence is below the threshold.
    Scanning,
    /// Running and confident.
    Tracking,
}

impl fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrackingStatus::Idle => "Idle",
            TrackingStatus::Scanning => "Scanning",
            TrackingStatus::Tracking => "Tracking",
        })
    }
}

/// Values set through the control surface.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlState {
    pub expression_active: bool,
    pub gesture_active: bool,
    pub confidence_threshold: f32,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            expression_active: false,
            gesture_active: false,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}
