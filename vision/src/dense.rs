//! Fully-connected layers and the activations used by the bundled models.

use serde::{Deserialize, Serialize};

use crate::InferenceError;

/// A fully-connected layer: `y = W·x + b`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    /// One row of input weights per output.
    pub weights: Vec<Vec<f32>>,
    /// One bias per output.
    pub bias: Vec<f32>,
}

impl Dense {
    /// Number of inputs the layer consumes.
    pub fn inputs(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    /// Number of outputs the layer produces.
    pub fn outputs(&self) -> usize {
        self.weights.len()
    }

    /// Check the layer is rectangular and the bias matches.
    pub fn validate(&self) -> Result<(), String> {
        if self.weights.is_empty() || self.inputs() == 0 {
            return Err("layer has no weights".into());
        }
        let inputs = self.inputs();
        if let Some(row) = self.weights.iter().position(|r| r.len() != inputs) {
            return Err(format!("weight row {row} is not {inputs} wide"));
        }
        if self.bias.len() != self.outputs() {
            return Err(format!(
                "bias has {} entries for {} outputs",
                self.bias.len(),
                self.outputs()
            ));
        }
        Ok(())
    }

    /// Apply the layer to `x`.
    pub fn forward(&self, x: &[f32]) -> Result<Vec<f32>, InferenceError> {
        if x.len() != self.inputs() {
            return Err(InferenceError::Shape {
                expected: self.inputs(),
                got: x.len(),
            });
        }
        Ok(self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f32>() + b)
            .collect())
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

pub fn relu(x: f32) -> f32 {
    x.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer() -> Dense {
        Dense {
            weights: vec![vec![1.0, 0.0], vec![0.5, 0.5]],
            bias: vec![0.0, 1.0],
        }
    }

    #[test]
    fn forward_applies_weights_and_bias() {
        assert_eq!(layer().forward(&[2.0, 4.0]).unwrap(), vec![2.0, 4.0]);
    }

    #[test]
    fn forward_rejects_wrong_width() {
        assert!(matches!(
            layer().forward(&[1.0]),
            Err(InferenceError::Shape { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn validate_catches_ragged_rows() {
        let mut l = layer();
        l.weights[1].pop();
        assert!(l.validate().is_err());
        let mut l = layer();
        l.bias.push(0.0);
        assert!(l.validate().is_err());
        assert!(layer().validate().is_ok());
    }

    #[test]
    fn softmax_is_a_distribution() {
        let p = softmax(&[1000.0, 1000.0]);
        assert!((p[0] - 0.5).abs() < 1e-6);
        assert!((p.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }
}
