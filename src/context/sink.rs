use crate::context::mode::Mode;
use crate::context::stack::{ContextStack, Snapshot};
use crate::error::ContextError;
use crate::node::NodeConfig;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

static SINKS: ContextStack<Sink> = ContextStack::new("capflow.sink");

/// Capture sessions currently open anywhere in the process.
static LIVE: AtomicUsize = AtomicUsize::new(0);

struct LiveGuard;

impl LiveGuard {
    fn open() -> Self {
        LIVE.fetch_add(1, Ordering::Relaxed);
        LiveGuard
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        LIVE.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Accumulates the configs committed during one capture session.
#[derive(Clone, Default)]
pub struct Sink {
    children: Arc<Mutex<Vec<NodeConfig>>>,
}

impl Sink {
    /// Run `f` with a fresh sink active and return what it captured.
    pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<NodeConfig>) {
        let sink = Sink::default();
        let _live = LiveGuard::open();
        let output = SINKS.scope(sink.clone(), f);
        (output, sink.take())
    }

    pub async fn capture_async<F: Future>(future: F) -> (F::Output, Vec<NodeConfig>) {
        let sink = Sink::default();
        let _live = LiveGuard::open();
        let output = SINKS.scope_async(sink.clone(), future).await;
        (output, sink.take())
    }

    /// The nearest sink visible from the caller.
    pub fn active() -> Option<Sink> {
        SINKS.nearest()
    }

    /// Commit `config` to the nearest active sink.
    pub fn put(config: NodeConfig) -> Result<(), ContextError> {
        if Mode::current() != Mode::Build {
            return Err(ContextError::NotBuilding {
                node: config.node().name().to_string(),
            });
        }
        let sink = Sink::active().ok_or_else(|| ContextError::NoActiveSink {
            node: config.node().name().to_string(),
        })?;
        debug!(node = config.node().name(), children = config.children().len(), "committed capture");
        sink.lock().push(config);
        Ok(())
    }

    /// True when the caller sees no context at all while some capture is
    /// open elsewhere, e.g. a task spawned from a building pipeline without
    /// [`Snapshot::instrument`]. Such a caller runs instead of capturing.
    pub fn is_detached() -> bool {
        LIVE.load(Ordering::Relaxed) > 0 && Snapshot::capture().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn take(&self) -> Vec<NodeConfig> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<NodeConfig>> {
        // a poisoned list is still a valid list
        self.children.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink").field("children", &self.len()).finish()
    }
}
