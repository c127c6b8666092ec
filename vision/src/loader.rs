use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::expression::{DenseExpressionModel, ExpressionArtifact, ExpressionModel};
use crate::gesture::{
    ClassifierArtifact, DenseFeatureExtractor, ExtractorArtifact, FeatureExtractor,
    GestureClassifier, SoftmaxClassifier,
};
use crate::{LoadError, ModelKind, ModelSource};

/// Shared reference to a loaded model.
///
/// Cloning is cheap; clones point at the same model.
#[derive(Clone)]
pub enum ModelHandle {
    Expression(Arc<dyn ExpressionModel>),
    FeatureExtractor(Arc<dyn FeatureExtractor>),
    Classifier(Arc<dyn GestureClassifier>),
}

impl ModelHandle {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelHandle::Expression(_) => ModelKind::Expression,
            ModelHandle::FeatureExtractor(_) => ModelKind::FeatureExtractor,
            ModelHandle::Classifier(_) => ModelKind::Classifier,
        }
    }

    /// Whether both handles refer to the very same loaded model.
    pub fn same_model(&self, other: &ModelHandle) -> bool {
        match (self, other) {
            (ModelHandle::Expression(a), ModelHandle::Expression(b)) => Arc::ptr_eq(a, b),
            (ModelHandle::FeatureExtractor(a), ModelHandle::FeatureExtractor(b)) => {
                Arc::ptr_eq(a, b)
            }
            (ModelHandle::Classifier(a), ModelHandle::Classifier(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn expression(&self) -> Option<Arc<dyn ExpressionModel>> {
        match self {
            ModelHandle::Expression(m) => Some(m.clone()),
            _ => None,
        }
    }

    pub fn feature_extractor(&self) -> Option<Arc<dyn FeatureExtractor>> {
        match self {
            ModelHandle::FeatureExtractor(m) => Some(m.clone()),
            _ => None,
        }
    }

    pub fn classifier(&self) -> Option<Arc<dyn GestureClassifier>> {
        match self {
            ModelHandle::Classifier(m) => Some(m.clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelHandle").field(&self.kind()).finish()
    }
}

/// Brings a model of a given kind into memory.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, kind: ModelKind) -> Result<ModelHandle, LoadError>;
}

/// Loader decoding JSON artifacts fetched from a [`ModelSource`].
pub struct ArtifactLoader<S> {
    source: S,
}

impl<S: ModelSource> ArtifactLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

fn decode<T: DeserializeOwned>(kind: ModelKind, bytes: &[u8]) -> Result<T, LoadError> {
    serde_json::from_slice(bytes).map_err(|e| LoadError::Malformed {
        kind,
        message: e.to_string(),
    })
}

fn malformed(kind: ModelKind) -> impl Fn(String) -> LoadError {
    move |message| LoadError::Malformed { kind, message }
}

#[async_trait]
impl<S: ModelSource> ModelLoader for ArtifactLoader<S> {
    async fn load(&self, kind: ModelKind) -> Result<ModelHandle, LoadError> {
        let bytes = self.source.fetch(kind).await?;
        let handle = match kind {
            ModelKind::Expression => {
                let artifact: ExpressionArtifact = decode(kind, &bytes)?;
                let model = DenseExpressionModel::from_artifact(artifact).map_err(malformed(kind))?;
                ModelHandle::Expression(Arc::new(model))
            }
            ModelKind::FeatureExtractor => {
                let artifact: ExtractorArtifact = decode(kind, &bytes)?;
                let model = DenseFeatureExtractor::from_artifact(artifact).map_err(malformed(kind))?;
                ModelHandle::FeatureExtractor(Arc::new(model))
            }
            ModelKind::Classifier => {
                let artifact: ClassifierArtifact = decode(kind, &bytes)?;
                let model = SoftmaxClassifier::from_artifact(artifact).map_err(malformed(kind))?;
                info!(labels = ?model.labels(), "gesture classifier decoded");
                ModelHandle::Classifier(Arc::new(model))
            }
        };
        Ok(handle)
    }
}
