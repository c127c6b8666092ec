use async_trait::async_trait;
use sensor::Frame;
use serde::{Deserialize, Serialize};
use image::DynamicImage;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::dense::{Dense, sigmoid, softmax};
use crate::preprocess::{candidate_windows, luma_thumbnail, pixel_count, scan_image};
use crate::InferenceError;

/// The closed set of facial expressions the model scores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expression {
    Angry,
    Disgusted,
    Fearful,
    Happy,
    Neutral,
    Sad,
    Surprised,
}

impl Expression {
    /// All labels in model output order.
    pub const ALL: [Expression; 7] = [
        Expression::Angry,
        Expression::Disgusted,
        Expression::Fearful,
        Expression::Happy,
        Expression::Neutral,
        Expression::Sad,
        Expression::Surprised,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Expression::Angry => "angry",
            Expression::Disgusted => "disgusted",
            Expression::Fearful => "fearful",
            Expression::Happy => "happy",
            Expression::Neutral => "neutral",
            Expression::Sad => "sad",
            Expression::Surprised => "surprised",
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probability estimate per [`Expression`]. Values are in `[0, 1]` but need
/// not sum to exactly one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionScores {
    pub angry: f32,
    pub disgusted: f32,
    pub fearful: f32,
    pub happy: f32,
    pub neutral: f32,
    pub sad: f32,
    pub surprised: f32,
}

impl ExpressionScores {
    /// Build scores from probabilities listed in [`Expression::ALL`] order.
    ///
    /// Values are clamped into `[0, 1]`. Returns `None` unless exactly seven
    /// values are given.
    pub fn from_probabilities(p: &[f32]) -> Option<Self> {
        let [angry, disgusted, fearful, happy, neutral, sad, surprised]: [f32; 7] =
            p.try_into().ok()?;
        let c = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Some(Self {
            angry: c(angry),
            disgusted: c(disgusted),
            fearful: c(fearful),
            happy: c(happy),
            neutral: c(neutral),
            sad: c(sad),
            surprised: c(surprised),
        })
    }

    pub fn get(&self, expression: Expression) -> f32 {
        match expression {
            Expression::Angry => self.angry,
            Expression::Disgusted => self.disgusted,
            Expression::Fearful => self.fearful,
            Expression::Happy => self.happy,
            Expression::Neutral => self.neutral,
            Expression::Sad => self.sad,
            Expression::Surprised => self.surprised,
        }
    }

    /// The `angry` entry.
    pub fn anger(&self) -> f32 {
        self.angry
    }

    /// Highest-scoring expression. Ties go to the earlier label.
    pub fn dominant(&self) -> (Expression, f32) {
        Expression::ALL
            .iter()
            .map(|e| (*e, self.get(*e)))
            .fold((Expression::Angry, f32::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 { cur } else { best }
            })
    }
}

/// A model scoring the expression of the face in a frame.
#[async_trait]
pub trait ExpressionModel: Send + Sync {
    /// Score the single most prominent face, or `Ok(None)` if there is none.
    async fn detect(&self, frame: &Frame) -> Result<Option<ExpressionScores>, InferenceError>;
}

/// Logistic face-presence gate over the thumbnail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceGate {
    pub weights: Vec<f32>,
    pub bias: f32,
    /// Minimum gate probability for a face to count as present.
    pub min_score: f32,
}

/// Serialized form of [`DenseExpressionModel`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpressionArtifact {
    /// Side length of the square grayscale thumbnail fed to the model.
    pub input_size: u32,
    pub face: FaceGate,
    /// Seven logits in [`Expression::ALL`] order.
    pub head: Dense,
}

/// Expression model made of a face gate and a softmax head.
///
/// The gate is slid over the frame at several window sizes; the best-scoring
/// window is taken as the face and only that crop reaches the head.
#[derive(Clone, Debug)]
pub struct DenseExpressionModel {
    artifact: Arc<ExpressionArtifact>,
}

impl DenseExpressionModel {
    /// Check shapes and wrap `artifact`.
    pub fn from_artifact(artifact: ExpressionArtifact) -> Result<Self, String> {
        let pixels = pixel_count(artifact.input_size)?;
        if artifact.face.weights.len() != pixels {
            return Err(format!(
                "face gate expects {} weights, found {}",
                pixels,
                artifact.face.weights.len()
            ));
        }
        if !(0.0..=1.0).contains(&artifact.face.min_score) {
            return Err("face min_score must lie in [0, 1]".into());
        }
        artifact.head.validate()?;
        if artifact.head.inputs() != pixels {
            return Err(format!(
                "head expects {} inputs, thumbnail has {}",
                artifact.head.inputs(),
                pixels
            ));
        }
        if artifact.head.outputs() != Expression::ALL.len() {
            return Err(format!(
                "head must produce {} scores, produces {}",
                Expression::ALL.len(),
                artifact.head.outputs()
            ));
        }
        Ok(Self {
            artifact: Arc::new(artifact),
        })
    }

    fn face_score(&self, x: &[f32]) -> f32 {
        let gate = &self.artifact.face;
        let z: f32 = gate.weights.iter().zip(x).map(|(w, v)| w * v).sum::<f32>() + gate.bias;
        sigmoid(z)
    }

    /// Best face window and its gate score.
    fn locate_face(&self, image: &DynamicImage) -> Option<(f32, Vec<f32>)> {
        let side = self.artifact.input_size;
        candidate_windows(&scan_image(image))
            .iter()
            .map(|window| {
                let x = luma_thumbnail(window, side);
                (self.face_score(&x), x)
            })
            .max_by(|a, b| a.0.total_cmp(&b.0))
    }

    fn score(&self, frame: &Frame) -> Result<Option<ExpressionScores>, InferenceError> {
        let image = frame.decode()?;
        let Some((face, x)) = self.locate_face(&image) else {
            return Ok(None);
        };
        if face < self.artifact.face.min_score {
            debug!(face, "no face detected");
            return Ok(None);
        }
        let probs = softmax(&self.artifact.head.forward(&x)?);
        ExpressionScores::from_probabilities(&probs)
            .map(Some)
            .ok_or(InferenceError::Empty)
    }
}

#[async_trait]
impl ExpressionModel for DenseExpressionModel {
    async fn detect(&self, frame: &Frame) -> Result<Option<ExpressionScores>, InferenceError> {
        let model = self.clone();
        let frame = frame.clone();
        tokio::task::spawn_blocking(move || model.score(&frame)).await?
    }
}
