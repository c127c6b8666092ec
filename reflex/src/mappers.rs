//! Pure mappings from model output to control values.
//!
//! Nothing here keeps state; identical inputs always give identical outputs.

use std::ops::RangeInclusive;

use crate::signal::TrackingStatus;

/// Anger score at which the speed boost begins.
pub const DEFAULT_ANGER_THRESHOLD: f32 = 0.7;
/// Speed at or below the anger threshold.
pub const MIN_SPEED: f32 = 1.0;
/// Speed at full anger.
pub const MAX_SPEED: f32 = 3.0;
/// Allowed range for the gesture confidence threshold.
pub const CONFIDENCE_THRESHOLD_RANGE: RangeInclusive<f32> = 0.5..=0.95;
/// Confidence threshold used until the user moves the slider.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// Game speed multiplier for an anger score.
///
/// Flat [`MIN_SPEED`] below `threshold`, then linear up to [`MAX_SPEED`] at
/// an anger of 1.0.
///
/// ```
/// use reflex::mappers::speed_multiplier;
/// assert_eq!(speed_multiplier(0.5, 0.7), 1.0);
/// assert!((speed_multiplier(0.85, 0.7) - 2.0).abs() < 1e-5);
/// assert_eq!(speed_multiplier(1.0, 0.7), 3.0);
/// ```
pub fn speed_multiplier(anger: f32, threshold: f32) -> f32 {
    let threshold = if threshold.is_nan() {
        DEFAULT_ANGER_THRESHOLD
    } else {
        threshold.clamp(0.0, 1.0)
    };
    if anger.is_nan() || anger < threshold {
        return MIN_SPEED;
    }
    let span = 1.0 - threshold;
    if span <= f32::EPSILON {
        return MAX_SPEED;
    }
    let normalized = ((anger - threshold) / span).clamp(0.0, 1.0);
    MIN_SPEED + normalized * (MAX_SPEED - MIN_SPEED)
}

/// Whether `anger` counts as angry.
pub fn is_angry(anger: f32, threshold: f32) -> bool {
    anger >= threshold
}

/// Ternary readout for the gesture loop.
pub fn confidence_status(active: bool, confidence: f32, threshold: f32) -> TrackingStatus {
    if !active {
        TrackingStatus::Idle
    } else if confidence >= threshold {
        TrackingStatus::Tracking
    } else {
        TrackingStatus::Scanning
    }
}

/// Confidence relative to the threshold, clamped into `[0, 1]`.
///
/// Overlays interpolate colour, opacity and ring geometry from this value;
/// it reaches 1.0 exactly when the prediction becomes actionable.
pub fn confidence_ratio(confidence: f32, threshold: f32) -> f32 {
    let ratio = confidence / threshold.max(0.001);
    if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) }
}

/// Pull a requested confidence threshold into [`CONFIDENCE_THRESHOLD_RANGE`].
pub fn clamp_confidence_threshold(value: f32) -> f32 {
    if value.is_nan() {
        DEFAULT_CONFIDENCE_THRESHOLD
    } else {
        value.clamp(
            *CONFIDENCE_THRESHOLD_RANGE.start(),
            *CONFIDENCE_THRESHOLD_RANGE.end(),
        )
    }
}
