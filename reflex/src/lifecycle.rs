use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::error;

use crate::LoopError;

/// Where a polling loop is in its life.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopState {
    #[default]
    Idle,
    Running,
    /// Stop requested; the current tick is being allowed to finish.
    Stopping,
}

/// Cooperative stop flag handed to one run of a loop.
///
/// The flag trips when the owner calls stop, or when the owner goes away.
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolve once a stop has been requested.
    pub async fn stopped(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }

    /// Sleep out whatever is left of `period` since `started`.
    ///
    /// Returns `false` if a stop arrived while waiting.
    pub async fn pace(&mut self, started: Instant, period: Duration) -> bool {
        let remaining = period.saturating_sub(started.elapsed());
        let slept = tokio::select! {
            _ = self.stopped() => false,
            _ = tokio::time::sleep(remaining) => true,
        };
        slept && !self.is_stopped()
    }
}

#[derive(Default)]
struct Status {
    state: LoopState,
    generation: u64,
}

struct Run {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Start/stop bookkeeping shared by both loops.
///
/// Each start spawns a fresh task with its own [`StopSignal`]. A run started
/// while the previous one is still finishing waits for it first, so ticks of
/// one loop never overlap.
#[derive(Default)]
pub(crate) struct Lifecycle {
    status: Arc<Mutex<Status>>,
    run: Mutex<Option<Run>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Lifecycle {
    pub(crate) fn state(&self) -> LoopState {
        lock(&self.status).state
    }

    /// Spawn `body` as the new run. Must be called inside a tokio runtime.
    pub(crate) fn start<F, Fut>(&self, body: F) -> Result<(), LoopError>
    where
        F: FnOnce(StopSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut run = lock(&self.run);
        let generation = {
            let mut status = lock(&self.status);
            if status.state == LoopState::Running {
                return Err(LoopError::AlreadyRunning);
            }
            status.state = LoopState::Running;
            status.generation += 1;
            status.generation
        };

        let (stop, rx) = watch::channel(false);
        let previous = run.take().map(|r| r.handle);
        let body = body(StopSignal { rx });
        let status = self.status.clone();
        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            if AssertUnwindSafe(body).catch_unwind().await.is_err() {
                error!("loop task panicked");
            }
            let mut status = lock(&status);
            if status.generation == generation {
                status.state = LoopState::Idle;
            }
        });
        *run = Some(Run { stop, handle });
        Ok(())
    }

    /// Ask the current run to stop at its next tick boundary.
    pub(crate) fn stop(&self) {
        let run = lock(&self.run);
        let mut status = lock(&self.status);
        if status.state != LoopState::Running {
            return;
        }
        status.state = LoopState::Stopping;
        if let Some(run) = run.as_ref() {
            run.stop.send_replace(true);
        }
    }

    /// Stop the current run and wait for its task to exit.
    pub(crate) async fn finish(&self) {
        self.stop();
        let handle = lock(&self.run).take().map(|r| r.handle);
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}
