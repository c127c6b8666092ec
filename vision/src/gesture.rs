use async_trait::async_trait;
use sensor::Frame;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::dense::{Dense, relu, softmax};
use crate::preprocess::{pixel_count, thumbnail};
use crate::InferenceError;

/// Turns a frame into a feature vector for the gesture classifier.
#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    async fn extract(&self, frame: &Frame) -> Result<Vec<f32>, InferenceError>;
}

/// Maps extracted features to the most likely label.
#[async_trait]
pub trait GestureClassifier: Send + Sync {
    async fn classify(&self, features: &[f32]) -> Result<Prediction, InferenceError>;
}

/// Winning label and its softmax probability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

/// Serialized form of [`DenseFeatureExtractor`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractorArtifact {
    pub input_size: u32,
    pub layer: Dense,
}

/// One ReLU layer over a grayscale thumbnail.
#[derive(Clone, Debug)]
pub struct DenseFeatureExtractor {
    artifact: Arc<ExtractorArtifact>,
}

impl DenseFeatureExtractor {
    pub fn from_artifact(artifact: ExtractorArtifact) -> Result<Self, String> {
        artifact.layer.validate()?;
        let pixels = pixel_count(artifact.input_size)?;
        if artifact.layer.inputs() != pixels {
            return Err(format!(
                "layer expects {} inputs, thumbnail has {}",
                artifact.layer.inputs(),
                pixels
            ));
        }
        Ok(Self {
            artifact: Arc::new(artifact),
        })
    }

    /// Width of the produced feature vector.
    pub fn features(&self) -> usize {
        self.artifact.layer.outputs()
    }
}

#[async_trait]
impl FeatureExtractor for DenseFeatureExtractor {
    async fn extract(&self, frame: &Frame) -> Result<Vec<f32>, InferenceError> {
        let artifact = self.artifact.clone();
        let frame = frame.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<f32>, InferenceError> {
            let image = frame.decode()?;
            let x = thumbnail(&image, artifact.input_size);
            Ok(artifact.layer.forward(&x)?.into_iter().map(relu).collect())
        })
        .await?
    }
}

/// Serialized form of [`SoftmaxClassifier`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    /// Output labels, one per layer row.
    pub labels: Vec<String>,
    pub layer: Dense,
}

/// Single dense layer followed by softmax.
#[derive(Clone, Debug)]
pub struct SoftmaxClassifier {
    artifact: ClassifierArtifact,
}

impl SoftmaxClassifier {
    pub fn from_artifact(artifact: ClassifierArtifact) -> Result<Self, String> {
        artifact.layer.validate()?;
        if artifact.labels.len() != artifact.layer.outputs() {
            return Err(format!(
                "{} labels for {} outputs",
                artifact.labels.len(),
                artifact.layer.outputs()
            ));
        }
        Ok(Self { artifact })
    }

    pub fn labels(&self) -> &[String] {
        &self.artifact.labels
    }
}

#[async_trait]
impl GestureClassifier for SoftmaxClassifier {
    async fn classify(&self, features: &[f32]) -> Result<Prediction, InferenceError> {
        let probs = softmax(&self.artifact.layer.forward(features)?);
        let (index, confidence) = probs
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| !p.is_nan())
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or(InferenceError::Empty)?;
        Ok(Prediction {
            label: self.artifact.labels[index].clone(),
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> SoftmaxClassifier {
        SoftmaxClassifier::from_artifact(ClassifierArtifact {
            labels: vec!["up".into(), "down".into()],
            layer: Dense {
                weights: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                bias: vec![0.0, 0.0],
            },
        })
        .unwrap()
    }

    #[tokio::test]
    async fn picks_highest_probability() {
        let p = classifier().classify(&[0.0, 3.0]).await.unwrap();
        assert_eq!(p.label, "down");
        assert!(p.confidence > 0.9 && p.confidence <= 1.0);
    }

    #[tokio::test]
    async fn wrong_width_is_an_error() {
        assert!(classifier().classify(&[1.0]).await.is_err());
    }

    #[test]
    fn label_count_must_match() {
        let artifact = ClassifierArtifact {
            labels: vec!["up".into()],
            layer: Dense {
                weights: vec![vec![1.0], vec![1.0]],
                bias: vec![0.0, 0.0],
            },
        };
        assert!(SoftmaxClassifier::from_artifact(artifact).is_err());
    }
}
