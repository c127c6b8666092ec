use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
};
use tracing::{debug, info, warn};

use crate::{LoadError, ModelHandle, ModelKind, ModelLoader};

type PendingLoad = Shared<BoxFuture<'static, Result<ModelHandle, LoadError>>>;

enum Slot {
    Loading { id: u64, load: PendingLoad },
    Ready(ModelHandle),
}

/// Deduplicating model cache.
///
/// The first [`ensure_loaded`](Self::ensure_loaded) for a kind starts a load;
/// callers arriving while it is in flight await that same load. A successful
/// load is kept for the life of the cache. A failed one is forgotten so the
/// next call retries, and every caller that was waiting receives the same
/// error.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use vision::{ArtifactLoader, DirSource, ModelCache, ModelKind};
/// # async fn demo() -> Result<(), vision::LoadError> {
/// let cache = ModelCache::new(Arc::new(ArtifactLoader::new(DirSource::new("models"))));
/// let model = cache.ensure_loaded(ModelKind::Expression).await?;
/// assert!(cache.is_loaded(ModelKind::Expression));
/// # let _ = model;
/// # Ok(())
/// # }
/// ```
pub struct ModelCache {
    loader: Arc<dyn ModelLoader>,
    slots: Mutex<HashMap<ModelKind, Slot>>,
    next_id: AtomicU64,
}

impl ModelCache {
    /// Create an empty cache backed by `loader`.
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<ModelKind, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the model for `kind`, loading it if nobody has yet.
    pub async fn ensure_loaded(&self, kind: ModelKind) -> Result<ModelHandle, LoadError> {
        let (id, load) = {
            let mut slots = self.slots();
            match slots.get(&kind) {
                Some(Slot::Ready(handle)) => return Ok(handle.clone()),
                Some(Slot::Loading { id, load }) => {
                    debug!(%kind, "joining in-flight model load");
                    (*id, load.clone())
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let load = start_load(self.loader.clone(), kind);
                    slots.insert(
                        kind,
                        Slot::Loading {
                            id,
                            load: load.clone(),
                        },
                    );
                    (id, load)
                }
            }
        };

        let result = load.await;

        let mut slots = self.slots();
        let settling = matches!(slots.get(&kind), Some(Slot::Loading { id: current, .. }) if *current == id);
        if settling {
            match &result {
                Ok(handle) => {
                    info!(%kind, "model loaded");
                    slots.insert(kind, Slot::Ready(handle.clone()));
                }
                Err(e) => {
                    warn!(%kind, "model load failed: {e}");
                    slots.remove(&kind);
                }
            }
        }
        result
    }

    /// The cached model for `kind`, without triggering a load.
    pub fn get(&self, kind: ModelKind) -> Option<ModelHandle> {
        match self.slots().get(&kind) {
            Some(Slot::Ready(handle)) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Whether `kind` has finished loading successfully.
    pub fn is_loaded(&self, kind: ModelKind) -> bool {
        self.get(kind).is_some()
    }

    /// Whether a load for `kind` is currently in flight.
    pub fn is_loading(&self, kind: ModelKind) -> bool {
        matches!(self.slots().get(&kind), Some(Slot::Loading { .. }))
    }
}

fn start_load(loader: Arc<dyn ModelLoader>, kind: ModelKind) -> PendingLoad {
    info!(%kind, "loading model");
    let load = async move {
        let handle = loader.load(kind).await?;
        if handle.kind() != kind {
            return Err(LoadError::WrongKind {
                want: kind,
                got: handle.kind(),
            });
        }
        Ok(handle)
    };
    // A panicking loader must settle the slot like any other failure.
    AssertUnwindSafe(load)
        .catch_unwind()
        .map(move |outcome| {
            outcome.unwrap_or_else(|_| {
                Err(LoadError::Fetch {
                    kind,
                    message: "loader panicked".into(),
                })
            })
        })
        .boxed()
        .shared()
}
