use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::PathBuf;
use tracing::debug;

use crate::{LoadError, ModelKind};

/// Where model artifacts come from.
#[async_trait]
pub trait ModelSource: Send + Sync {
    /// Fetch the raw artifact for `kind`.
    async fn fetch(&self, kind: ModelKind) -> Result<Vec<u8>, LoadError>;
}

/// Fetches artifacts over HTTP from `{base_url}/{artifact_name}`.
#[derive(Clone)]
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    /// Create a source rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, kind: ModelKind) -> String {
        format!("{}/{}", self.base_url, kind.artifact_name())
    }
}

#[async_trait]
impl ModelSource for HttpSource {
    async fn fetch(&self, kind: ModelKind) -> Result<Vec<u8>, LoadError> {
        let url = self.url(kind);
        debug!(%url, "fetching model artifact");
        let fetch_err = |e: reqwest::Error| LoadError::Fetch {
            kind,
            message: e.to_string(),
        };
        let res = self.client.get(&url).send().await.map_err(fetch_err)?;
        match res.status() {
            StatusCode::NOT_FOUND => Err(LoadError::NotFound(kind)),
            s if !s.is_success() => Err(LoadError::Fetch {
                kind,
                message: format!("{url} answered {s}"),
            }),
            _ => Ok(res.bytes().await.map_err(fetch_err)?.to_vec()),
        }
    }
}

/// Reads artifacts from a local directory.
#[derive(Clone, Debug)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ModelSource for DirSource {
    async fn fetch(&self, kind: ModelKind) -> Result<Vec<u8>, LoadError> {
        let path = self.root.join(kind.artifact_name());
        debug!(path = %path.display(), "reading model artifact");
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound(kind),
            _ => LoadError::Fetch {
                kind,
                message: format!("{}: {e}", path.display()),
            },
        })
    }
}
