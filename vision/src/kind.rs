use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a loadable model. The cache holds at most one of each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Face gate plus facial-expression head.
    Expression,
    /// Generic image embedding used in front of the gesture classifier.
    FeatureExtractor,
    /// Small user-trained classifier mapping embeddings to directions.
    Classifier,
}

impl ModelKind {
    /// Every kind, in load order.
    pub const ALL: [ModelKind; 3] = [
        ModelKind::Expression,
        ModelKind::FeatureExtractor,
        ModelKind::Classifier,
    ];

    /// File name of the artifact under the model location.
    pub fn artifact_name(self) -> &'static str {
        match self {
            ModelKind::Expression => "expression.json",
            ModelKind::FeatureExtractor => "feature_extractor.json",
            ModelKind::Classifier => "classifier.json",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelKind::Expression => "expression",
            ModelKind::FeatureExtractor => "gesture feature extractor",
            ModelKind::Classifier => "gesture classifier",
        })
    }
}
